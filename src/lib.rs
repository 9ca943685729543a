//! callrelay is a WebSocket signaling relay for one-to-one calls.
//!
//! Clients connect to `/{clientId}`, see who else is online, and negotiate a
//! call through the relay: request, accept or reject, then an opaque offer,
//! answer and candidates. The relay tracks each call's handshake state and
//! only forwards what fits it. Media never passes through here.
//!
//! It ships one binary, `signaling_server`, plus a small async client used by
//! the integration tests.

/// Handles configuration loading and management.
pub mod config;
/// Logging utilities: sinks, the file logger and the `sink_*!` macros.
pub mod log;
/// The relay: protocol, registry, call sessions, routing and transport.
pub mod signaling;
/// Async client for talking to the relay.
pub mod signaling_client;
