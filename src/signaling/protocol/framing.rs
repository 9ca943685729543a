use tokio_tungstenite::tungstenite::Message;

use super::{FrameError, MAX_FRAME_LEN, SignalingMsg, decode_msg, encode_msg};

/// Wraps one message in a WebSocket text frame.
pub fn encode_frame(msg: &SignalingMsg) -> Message {
    Message::text(encode_msg(msg))
}

/// Decodes a data frame.
///
/// Returns `None` for control frames (ping, pong, close), which the
/// connection task handles itself.
pub fn decode_frame(frame: &Message) -> Option<Result<SignalingMsg, FrameError>> {
    match frame {
        Message::Text(text) => Some(decode_text(text.as_str())),
        Message::Binary(_) => Some(Err(FrameError::Binary)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

fn decode_text(text: &str) -> Result<SignalingMsg, FrameError> {
    if text.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge {
            max: MAX_FRAME_LEN,
            actual: text.len(),
        });
    }
    Ok(decode_msg(text)?)
}
