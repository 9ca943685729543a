use crate::signaling::protocol::{ClientId, SignalingMsg};

/// Process-unique id of one accepted connection.
///
/// Distinguishes two connections that used the same client identifier one
/// after the other, so a late teardown never removes the newer registration.
pub type ConnId = u64;

/// A message the relay wants to send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMsg {
    pub target: ClientId,
    pub msg: SignalingMsg,
}

impl OutgoingMsg {
    pub fn new(target: impl Into<ClientId>, msg: SignalingMsg) -> Self {
        Self {
            target: target.into(),
            msg,
        }
    }
}
