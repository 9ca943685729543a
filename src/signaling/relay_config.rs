use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// How long a closing connection may spend flushing its outbox.
pub const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// PEM files for serving `wss://`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Typed relay settings, read from the `[Signaling]` and `[Tls]` sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub outbox_capacity: usize,
    pub event_queue_capacity: usize,
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
    pub tls: Option<TlsSettings>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            tls: None,
        }
    }
}

impl RelayConfig {
    /// Missing or unparsable keys fall back to their defaults. TLS is only
    /// enabled when `[Tls] enabled` is set and both paths are present.
    pub fn from_config(config: &Config) -> Self {
        let tls = if config.get_flag("Tls", "enabled") {
            match (
                config.get_non_empty("Tls", "cert_path"),
                config.get_non_empty("Tls", "key_path"),
            ) {
                (Some(cert), Some(key)) => Some(TlsSettings {
                    cert_path: PathBuf::from(cert),
                    key_path: PathBuf::from(key),
                }),
                _ => None,
            }
        } else {
            None
        };

        Self {
            bind_addr: config
                .get_non_empty_or_default("Signaling", "bind_addr", DEFAULT_BIND_ADDR)
                .to_owned(),
            outbox_capacity: config
                .get_parsed_or("Signaling", "outbox_capacity", DEFAULT_OUTBOX_CAPACITY)
                .max(1),
            event_queue_capacity: config
                .get_parsed_or(
                    "Signaling",
                    "event_queue_capacity",
                    DEFAULT_EVENT_QUEUE_CAPACITY,
                )
                .max(1),
            ping_interval: Duration::from_secs(
                config
                    .get_parsed_or("Signaling", "ping_interval_secs", DEFAULT_PING_INTERVAL_SECS)
                    .max(1),
            ),
            idle_timeout: Duration::from_secs(
                config
                    .get_parsed_or("Signaling", "idle_timeout_secs", DEFAULT_IDLE_TIMEOUT_SECS)
                    .max(1),
            ),
            tls,
        }
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }
}
