use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::signaling::protocol::{ClientId, SignalingMsg, decode_msg, encode_frame};
use crate::signaling_client::signaling_client_error::SignalingClientError;
use crate::signaling_client::signaling_command::SignalingCommand;
use crate::signaling_client::signaling_event::SignalingEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Async client for the relay, one WebSocket per instance.
///
/// A background task owns the socket. The application sends through
/// [`send`](Self::send) and reads everything the relay says through
/// [`recv`](Self::recv); the last event is always [`SignalingEvent::Closed`].
pub struct SignalingClient {
    client_id: ClientId,
    cmd_tx: mpsc::Sender<SignalingCommand>,
    events: mpsc::Receiver<SignalingEvent>,
}

impl SignalingClient {
    /// Connects to `{base_url}/{client_id}`, e.g. `ws://127.0.0.1:5000`.
    pub async fn connect(base_url: &str, client_id: &str) -> Result<Self, SignalingClientError> {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), client_id);
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SignalingClientError::ConnectionFailed(e.to_string()))?;

        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(connection_task(ws, cmd_rx, event_tx));

        Ok(Self {
            client_id: client_id.to_owned(),
            cmd_tx,
            events,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError> {
        self.cmd_tx
            .send(SignalingCommand::Send(msg))
            .await
            .map_err(|_| SignalingClientError::Disconnected)
    }

    /// Next event, or `None` after `Closed` has been handed out.
    pub async fn recv(&mut self) -> Option<SignalingEvent> {
        self.events.recv().await
    }

    /// Next relay message, skipping malformed frames. `None` once closed.
    pub async fn next_msg(&mut self) -> Option<SignalingMsg> {
        loop {
            match self.events.recv().await? {
                SignalingEvent::Msg(msg) => return Some(msg),
                SignalingEvent::Malformed(_) => continue,
                SignalingEvent::Closed { .. } => return None,
            }
        }
    }

    /// Sends a close frame and waits for the connection task to finish.
    pub async fn close(mut self) {
        let _ = self.cmd_tx.send(SignalingCommand::Disconnect).await;
        while self.events.recv().await.is_some() {}
    }
}

async fn connection_task<S>(
    mut ws: S,
    mut cmd_rx: mpsc::Receiver<SignalingCommand>,
    event_tx: mpsc::Sender<SignalingEvent>,
) where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message>
        + Unpin,
{
    let mut close_code = None;
    let mut close_reason = String::new();
    let mut closing = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !closing => match cmd {
                Some(SignalingCommand::Send(msg)) => {
                    if ws.send(encode_frame(&msg)).await.is_err() {
                        break;
                    }
                }
                Some(SignalingCommand::Disconnect) | None => {
                    closing = true;
                    if ws.send(Message::Close(None)).await.is_err() {
                        break;
                    }
                }
            },

            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let event = match decode_msg(text.as_str()) {
                        Ok(msg) => SignalingEvent::Msg(msg),
                        Err(e) => SignalingEvent::Malformed(e),
                    };
                    if event_tx.send(event).await.is_err() {
                        closing = true;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        close_code = Some(u16::from(frame.code));
                        close_reason = frame.reason.as_str().to_owned();
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    let _ = event_tx
        .send(SignalingEvent::Closed {
            code: close_code,
            reason: close_reason,
        })
        .await;
}
