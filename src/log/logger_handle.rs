use std::sync::mpsc;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink};

/// Cloneable, non-blocking handle to the file [`Logger`](super::Logger).
///
/// Calls never block the caller: when the worker falls behind and the bounded
/// queue is full, the line is dropped.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Attempts to enqueue a line without blocking.
    ///
    /// # Errors
    /// - `TrySendError::Full` when the bounded queue is at capacity.
    /// - `TrySendError::Disconnected` when the worker thread is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx.try_send(LogMsg::now(level, text, target))
    }
}
