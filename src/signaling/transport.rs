use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async_with_config};

use crate::log::LogSink;
use crate::signaling::errors::{IdentifierError, RegisterError};
use crate::signaling::outbox::Outbox;
use crate::signaling::protocol::{
    ClientId, MAX_WIRE_MESSAGE_LEN, decode_frame, encode_frame, is_valid_client_id,
};
use crate::signaling::registry::ClientConnection;
use crate::signaling::relay_config::{CLOSE_FLUSH_TIMEOUT, RelayConfig};
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::ConnId;
use crate::{sink_debug, sink_info, sink_warn};

/// Close reason sent when the identifier is already connected.
pub const DUPLICATE_IDENTIFIER_REASON: &str = "duplicate identifier";

/// Extracts the client identifier from the request path (`/{clientId}`).
pub fn parse_client_id(path: &str) -> Result<ClientId, IdentifierError> {
    let id = path.strip_prefix('/').unwrap_or(path);
    if id.is_empty() {
        return Err(IdentifierError::Missing);
    }
    if !is_valid_client_id(id) {
        return Err(IdentifierError::Invalid);
    }
    Ok(id.to_owned())
}

/// WebSocket settings for accepted connections: reads are capped at
/// `MAX_WIRE_MESSAGE_LEN` instead of tungstenite's 64 MiB default.
pub fn websocket_config() -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(MAX_WIRE_MESSAGE_LEN))
        .max_frame_size(Some(MAX_WIRE_MESSAGE_LEN))
}

/// Drives one client connection from handshake to teardown.
///
/// After a successful handshake and registration the connection is split
/// in two: a writer task drains the outbox to the socket and pings the client,
/// while this task reads frames and forwards them to the server loop. Once
/// either side stops, the disconnect is reported exactly once and this
/// function waits for the server loop to acknowledge it before returning.
/// A change on `shutdown` ends the connection the same way a client close
/// does.
pub async fn serve_connection<S>(
    stream: S,
    conn_id: ConnId,
    server_tx: mpsc::Sender<ServerEvent>,
    settings: Arc<RelayConfig>,
    mut shutdown: watch::Receiver<bool>,
    log: Arc<dyn LogSink>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut path = String::new();
    let capture_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        path = req.uri().path().to_owned();
        Ok(resp)
    };

    let mut ws = match accept_hdr_async_with_config(stream, capture_path, Some(websocket_config()))
        .await
    {
        Ok(ws) => ws,
        Err(e) => {
            sink_warn!(log, "[conn {}] websocket handshake failed: {}", conn_id, e);
            return;
        }
    };

    let client_id = match parse_client_id(&path) {
        Ok(id) => id,
        Err(e) => {
            sink_warn!(log, "[conn {}] refusing path {:?}: {}", conn_id, path, e);
            close_with_policy(&mut ws, &e.to_string()).await;
            return;
        }
    };

    // ---- Registration -----------------------------------------------------
    let outbox = Outbox::new(settings.outbox_capacity);
    let (reply, reply_rx) = oneshot::channel();
    let connect = ServerEvent::Connect {
        client_id: client_id.clone(),
        connection: ClientConnection::new(conn_id, outbox.clone()),
        reply,
    };
    if server_tx.send(connect).await.is_err() {
        sink_warn!(log, "[conn {}] server loop is gone", conn_id);
        let _ = ws.close(None).await;
        return;
    }

    match reply_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(RegisterError::DuplicateIdentifier(_))) => {
            close_with_policy(&mut ws, DUPLICATE_IDENTIFIER_REASON).await;
            return;
        }
        Err(_) => {
            let _ = ws.close(None).await;
            return;
        }
    }

    sink_info!(log, "[conn {}] {} connected", conn_id, client_id);

    // ---- Running ----------------------------------------------------------
    let (sink, mut frames) = ws.split();
    let mut writer = tokio::spawn(write_loop(
        sink,
        outbox.clone(),
        settings.ping_interval,
        conn_id,
        log.clone(),
    ));
    let mut writer_done = false;

    let why = loop {
        let next = tokio::select! {
            next = timeout(settings.idle_timeout, frames.next()) => next,
            _ = &mut writer, if !writer_done => {
                writer_done = true;
                break "write side closed";
            }
            _ = shutdown.changed() => break "server shutdown",
        };

        let frame = match next {
            Err(_) => break "idle timeout",
            Ok(None) => break "stream ended",
            Ok(Some(Err(tungstenite::Error::Capacity(e)))) => {
                sink_warn!(log, "[conn {}] {} sent an oversized message: {}", conn_id, client_id, e);
                break "message too large";
            }
            Ok(Some(Err(e))) => {
                sink_debug!(log, "[conn {}] read error: {}", conn_id, e);
                break "read error";
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let event = match decode_frame(&frame) {
            None if frame.is_close() => break "closed by client",
            None => continue,
            Some(Ok(msg)) => ServerEvent::MsgFromClient {
                client_id: client_id.clone(),
                msg,
            },
            Some(Err(e)) => ServerEvent::Malformed {
                client_id: client_id.clone(),
                reason: e.to_string(),
            },
        };

        if server_tx.send(event).await.is_err() {
            break "server loop stopped";
        }
    };

    // ---- Teardown ---------------------------------------------------------
    sink_info!(log, "[conn {}] {} disconnecting: {}", conn_id, client_id, why);

    let (done, done_rx) = oneshot::channel();
    let disconnected = ServerEvent::Disconnected {
        client_id: client_id.clone(),
        conn_id,
        done,
    };
    if server_tx.send(disconnected).await.is_ok() {
        let _ = done_rx.await;
    }

    outbox.close();
    if !writer_done && timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        sink_debug!(log, "[conn {}] writer did not flush in time", conn_id);
        writer.abort();
    }
}

/// Writer task: outbox -> socket, plus keepalive pings.
///
/// Ends when the outbox is closed and drained (sending a close frame) or when
/// the socket refuses a write.
async fn write_loop<W>(
    mut sink: W,
    outbox: Outbox,
    ping_every: Duration,
    conn_id: ConnId,
    log: Arc<dyn LogSink>,
) where
    W: Sink<Message> + Unpin,
{
    let mut ping = interval(ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            next = outbox.recv() => match next {
                Some(msg) => {
                    if sink.send(encode_frame(&msg)).await.is_err() {
                        sink_warn!(log, "[conn {}] write failed for {}", conn_id, msg.name());
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Sends a policy-violation close frame and waits briefly for the client's
/// close reply.
async fn close_with_policy<S>(ws: &mut WebSocketStream<S>, reason: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::Policy,
        reason: reason.to_owned().into(),
    };
    if ws.close(Some(frame)).await.is_err() {
        return;
    }
    let _ = timeout(CLOSE_FLUSH_TIMEOUT, async {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;
}
