//! Text wire protocol spoken over each client's WebSocket.
//!
//! One text frame carries one message: `<COMMAND> <argument...>`.

pub mod codec;
pub mod constants;
pub mod errors;
pub mod framing;
pub mod msg;
pub mod msg_type;
pub mod types;

pub use codec::{decode_msg, encode_msg};
pub use constants::*;
pub use errors::{FrameError, ProtoError};
pub use framing::{decode_frame, encode_frame};
pub use msg::SignalingMsg;
pub use msg_type::MsgType;
pub use types::{CallDecision, CallPhase, ClientId, IceCandidate, is_valid_client_id};
