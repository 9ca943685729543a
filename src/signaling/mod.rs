pub mod errors;
pub mod outbox;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod relay_config;
pub mod router;
pub mod run;
pub mod runtime;
pub mod server_event;
pub mod sessions;
pub mod signaling_server;
pub mod tls;
pub mod transport;
pub mod types;

pub use errors::{CallError, IdentifierError, RegisterError, SendError, ServerError};
pub use relay_config::{RelayConfig, TlsSettings};
pub use router::Router;
pub use signaling_server::SignalingServer;
