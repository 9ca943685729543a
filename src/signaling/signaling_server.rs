use std::future::{self, Future};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::ServerError;
use crate::signaling::relay_config::RelayConfig;
use crate::signaling::router::Router;
use crate::signaling::runtime::run_server_loop;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::tls;
use crate::signaling::transport::serve_connection;
use crate::signaling::types::ConnId;
use crate::{sink_info, sink_warn};

/// How long shutdown waits for open connections to finish their teardown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Top-level runtime object for the relay.
///
/// This owns:
/// - the bound listener
/// - relay settings
/// - the optional TLS acceptor (for `wss://`)
/// - logging sink
///
/// and knows how to spin up the central server loop plus one task per
/// accepted connection.
pub struct SignalingServer {
    listener: TcpListener,
    settings: Arc<RelayConfig>,
    tls: Option<TlsAcceptor>,
    log: Arc<dyn LogSink>,
}

impl SignalingServer {
    /// Binds `settings.bind_addr` and loads TLS material if configured.
    pub async fn bind(settings: RelayConfig, log: Arc<dyn LogSink>) -> Result<Self, ServerError> {
        let tls = match &settings.tls {
            Some(tls_settings) => {
                Some(tls::build_acceptor(tls_settings).map_err(ServerError::Tls)?)
            }
            None => None,
        };

        let listener =
            TcpListener::bind(&settings.bind_addr)
                .await
                .map_err(|source| ServerError::Bind {
                    addr: settings.bind_addr.clone(),
                    source,
                })?;

        Ok(Self {
            listener,
            settings: Arc::new(settings),
            tls,
            log,
        })
    }

    /// Convenience: bind with a `NoopLogSink`.
    pub async fn bind_no_log(settings: RelayConfig) -> Result<Self, ServerError> {
        Self::bind(settings, Arc::new(NoopLogSink)).await
    }

    /// Actual listening address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(future::pending()).await
    }

    /// Serves until `shutdown` completes, then closes every connection
    /// through the normal disconnect path and stops the server loop.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            settings,
            tls,
            log,
        } = self;

        // Events from all connections -> central server loop
        let (server_tx, server_rx) = mpsc::channel::<ServerEvent>(settings.event_queue_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);

        let server_loop = {
            let log_for_loop = log.clone();
            let router = Router::with_log(log.clone());
            tokio::spawn(async move {
                sink_info!(log_for_loop, "[signaling] server loop started");
                run_server_loop(router, log_for_loop, server_rx).await
            })
        };

        let mut connections = JoinSet::new();
        let mut next_conn_id: ConnId = 1;

        sink_info!(
            log,
            "signaling server listening on {} ({})",
            listener
                .local_addr()
                .map_or_else(|_| settings.bind_addr.clone(), |a| a.to_string()),
            if tls.is_some() { "wss" } else { "ws" }
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                Some(_) = connections.join_next(), if !connections.is_empty() => {}

                accepted = listener.accept() => {
                    let (tcp, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            sink_warn!(log, "incoming TCP accept failed: {:?} (continuing to accept)", e);
                            continue;
                        }
                    };
                    let _ = tcp.set_nodelay(true);

                    let conn_id = next_conn_id;
                    next_conn_id += 1;
                    sink_info!(log, "accepted TCP connection from {} as conn {}", peer, conn_id);

                    let server_tx = server_tx.clone();
                    let settings = settings.clone();
                    let stop_rx = stop_rx.clone();
                    let log = log.clone();
                    let tls = tls.clone();

                    connections.spawn(async move {
                        match tls {
                            Some(acceptor) => match acceptor.accept(tcp).await {
                                Ok(stream) => {
                                    serve_connection(stream, conn_id, server_tx, settings, stop_rx, log)
                                        .await;
                                }
                                Err(e) => {
                                    sink_warn!(log, "[conn {}] TLS handshake with {} failed: {}", conn_id, peer, e);
                                }
                            },
                            None => {
                                serve_connection(tcp, conn_id, server_tx, settings, stop_rx, log).await;
                            }
                        }
                    });
                }
            }
        }

        // ---- Shutdown -------------------------------------------------------
        sink_info!(log, "shutting down; closing {} connection(s)", connections.len());
        drop(listener);
        let _ = stop_tx.send(true);

        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            sink_warn!(log, "connections did not close in time; aborting them");
            connections.shutdown().await;
        }

        drop(server_tx);
        match server_loop.await {
            Ok(router) => {
                sink_info!(
                    log,
                    "server loop stopped ({} clients, {} calls left)",
                    router.registry().len(),
                    router.calls().len()
                );
            }
            Err(e) => sink_warn!(log, "server loop ended abnormally: {}", e),
        }

        Ok(())
    }
}
