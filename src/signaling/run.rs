use std::sync::Arc;

use crate::log::LogSink;
use crate::signaling::errors::ServerError;
use crate::signaling::relay_config::RelayConfig;
use crate::signaling::signaling_server::SignalingServer;
use crate::sink_info;

/// Run the relay with `settings` until Ctrl-C, using the given log sink.
pub async fn run_signaling_server_with_log(
    settings: RelayConfig,
    log_sink: Arc<dyn LogSink>,
) -> Result<(), ServerError> {
    let server = SignalingServer::bind(settings, log_sink.clone()).await?;
    sink_info!(log_sink, "relay bound to {}", server.local_addr()?);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
