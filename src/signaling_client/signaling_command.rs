use crate::signaling::protocol::SignalingMsg;

/// Commands issued by the application into the connection task.
#[derive(Debug)]
pub enum SignalingCommand {
    Send(SignalingMsg),
    Disconnect,
}
