use crate::log::log_level::LogLevel;

/// One queued line for the file logger.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the Unix epoch, taken when the line was produced.
    pub ts_ms: i64,
    pub text: String,
    /// Module path of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(level: LogLevel, text: impl Into<String>, target: &'static str, ts_ms: i64) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Stamps the line with the current wall-clock time.
    pub fn now(level: LogLevel, text: impl Into<String>, target: &'static str) -> Self {
        Self::new(level, text, target, chrono::Utc::now().timestamp_millis())
    }

    /// Renders the line as written to disk:
    /// `2026-01-02T03:04:05.678Z [INFO ] callrelay::signaling::router | text`
    pub fn render(&self) -> String {
        let ts = chrono::DateTime::from_timestamp_millis(self.ts_ms)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            .unwrap_or_else(|| format!("unix_ms_{}", self.ts_ms));
        format!(
            "{ts} [{}] {} | {}",
            self.level.as_str(),
            self.target,
            self.text
        )
    }
}
