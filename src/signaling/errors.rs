use thiserror::Error;

use crate::signaling::protocol::ClientId;

/// Why a connection could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("identifier {0} is already connected")]
    DuplicateIdentifier(ClientId),
}

/// Why a message could not be queued for a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("client {0} is not connected")]
    NotFound(ClientId),
    #[error("outbox of client {0} is full")]
    Full(ClientId),
    #[error("connection of client {0} is closing")]
    Closed(ClientId),
}

/// Why a call request was refused. The `Display` text is what the caller
/// receives in the `ERROR` reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("cannot call yourself")]
    SelfCall,
    #[error("user {0} is not online")]
    TargetOffline(ClientId),
    #[error("session already exists")]
    CallerBusy,
    #[error("user {0} is already in a session")]
    TargetBusy(ClientId),
}

/// Problems with the identifier carried in the connection URL path.
///
/// The `Display` text is the close-frame reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("missing identifier")]
    Missing,
    #[error("invalid identifier")]
    Invalid,
}

/// Failures that stop the relay from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
