use std::sync::Arc;

use tokio::sync::mpsc::Receiver;

use crate::log::LogSink;
use crate::signaling::router::Router;
use crate::signaling::server_event::ServerEvent;
use crate::{sink_debug, sink_info};

/// Central server loop: the only place that touches the Router.
///
/// Events are applied strictly one at a time in arrival order, so every
/// registry and call-table mutation is linearized here. Returns the Router
/// once every event sender is gone.
pub async fn run_server_loop(
    mut router: Router,
    log: Arc<dyn LogSink>,
    mut rx: Receiver<ServerEvent>,
) -> Router {
    use ServerEvent::*;

    while let Some(ev) = rx.recv().await {
        match ev {
            Connect {
                client_id,
                connection,
                reply,
            } => {
                let result = router.connect(client_id, connection);
                // The connection task may already be gone; the registration
                // then gets undone by its Disconnected event.
                let _ = reply.send(result);
            }

            MsgFromClient { client_id, msg } => {
                router.handle_from_client(&client_id, msg);
            }

            Malformed { client_id, reason } => {
                router.reject_malformed(&client_id, &reason);
            }

            Disconnected {
                client_id,
                conn_id,
                done,
            } => {
                sink_debug!(log, "disconnect event for {} (conn {})", client_id, conn_id);
                router.disconnect(&client_id, conn_id);
                let _ = done.send(());
            }
        }
    }

    sink_info!(
        log,
        "ServerEvent channel closed; server loop shutting down ({} clients left)",
        router.registry().len()
    );
    router
}
