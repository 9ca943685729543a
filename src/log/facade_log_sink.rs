use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Forwards relay log lines to the `log` facade.
///
/// The binary pairs this with `env_logger` when no log directory is
/// configured, so `RUST_LOG` controls what reaches stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLogSink;

impl LogSink for FacadeLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        log::log!(target: target, level.to_facade(), "{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_levels_keep_their_order() {
        assert!(LogLevel::Trace.to_facade() > LogLevel::Error.to_facade());
        assert_eq!(LogLevel::Warn.to_facade(), log::Level::Warn);
    }

    #[test]
    fn logging_without_installed_logger_is_harmless() {
        FacadeLogSink.log(LogLevel::Info, "nobody listens", "callrelay::test");
    }
}
