use tokio::sync::oneshot;

use crate::signaling::errors::RegisterError;
use crate::signaling::protocol::{ClientId, SignalingMsg};
use crate::signaling::registry::ClientConnection;
use crate::signaling::types::ConnId;

/// Events sent *to* the central server loop.
pub enum ServerEvent {
    /// A handshake completed; register the connection under `client_id`.
    Connect {
        client_id: ClientId,
        connection: ClientConnection,
        reply: oneshot::Sender<Result<(), RegisterError>>,
    },

    /// A registered client sent a signaling message.
    MsgFromClient { client_id: ClientId, msg: SignalingMsg },

    /// A registered client sent a frame that did not parse.
    Malformed { client_id: ClientId, reason: String },

    /// A connection went away (close frame, socket error, idle timeout).
    ///
    /// `done` fires once every consequence of the disconnect has been queued.
    Disconnected {
        client_id: ClientId,
        conn_id: ConnId,
        done: oneshot::Sender<()>,
    },
}
