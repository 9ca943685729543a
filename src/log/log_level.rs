/// Severity of a relay log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-frame detail (every forwarded candidate, every keepalive).
    Trace,
    /// State-machine transitions and dropped stale messages.
    Debug,
    /// Connection lifecycle and call setup/teardown.
    Info,
    /// Protocol violations and delivery failures.
    Warn,
    /// Failures that cost a client its connection or the server a listener.
    Error,
}

impl LogLevel {
    /// Fixed-width label used by the file logger.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warn => "WARN ",
            Self::Error => "ERROR",
        }
    }

    /// Equivalent level of the `log` facade.
    pub fn to_facade(self) -> log::Level {
        match self {
            Self::Trace => log::Level::Trace,
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}
