use crate::signaling::protocol::{ProtoError, SignalingMsg};

/// What the connection task reports back to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingEvent {
    /// A message from the relay.
    Msg(SignalingMsg),
    /// A text frame that did not parse.
    Malformed(ProtoError),
    /// The connection is gone. `code` and `reason` come from the relay's
    /// close frame, when it sent one.
    Closed { code: Option<u16>, reason: String },
}
