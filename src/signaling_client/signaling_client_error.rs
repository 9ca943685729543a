use thiserror::Error;

/// Errors surfaced by [`SignalingClient`](super::SignalingClient).
///
/// Once connected, the only thing `send()` can reliably report is that the
/// connection task has exited and dropped its command receiver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingClientError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),
    #[error("signaling client disconnected")]
    Disconnected,
}
