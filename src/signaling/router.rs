use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::errors::{CallError, RegisterError};
use crate::signaling::presence;
use crate::signaling::protocol::{CallDecision, ClientId, SignalingMsg};
use crate::signaling::registry::{ClientConnection, ConnectionRegistry};
use crate::signaling::sessions::{CallSignal, CallState, CallTable};
use crate::signaling::types::{ConnId, OutgoingMsg};
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

/// Relay state plus the rules for changing it.
///
/// The Router owns the connection registry and the call table and is only
/// ever driven by the server loop, one event at a time. Handlers compute the
/// messages a step produces; `deliver` then queues them on the target
/// outboxes.
pub struct Router {
    registry: ConnectionRegistry,
    calls: CallTable,
    log: Arc<dyn LogSink>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            calls: CallTable::new(),
            log,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn calls(&self) -> &CallTable {
        &self.calls
    }

    // ---- Connection lifecycle -------------------------------------------

    /// Registers a freshly accepted connection and broadcasts presence.
    pub fn connect(
        &mut self,
        client_id: ClientId,
        connection: ClientConnection,
    ) -> Result<(), RegisterError> {
        let conn_id = connection.conn_id();
        if let Err(e) = self.registry.register(client_id.clone(), connection) {
            sink_warn!(
                self.log,
                "rejecting conn {} for {}: {}",
                conn_id,
                client_id,
                e
            );
            return Err(e);
        }

        sink_info!(
            self.log,
            "client {} registered on conn {} ({} online)",
            client_id,
            conn_id,
            self.registry.len()
        );

        let out = presence::broadcast_online_users(&self.registry);
        self.deliver(out);
        Ok(())
    }

    /// Tears down everything connection `conn_id` held under `client_id`.
    ///
    /// Ends its call (the surviving party gets one `END_CALL`), then
    /// broadcasts presence. Returns `false` when there was nothing to tear
    /// down, e.g. on a repeated call.
    pub fn disconnect(&mut self, client_id: &str, conn_id: ConnId) -> bool {
        let Some(connection) = self.registry.unregister(client_id, conn_id) else {
            sink_debug!(
                self.log,
                "disconnect for {} (conn {}) ignored: not registered",
                client_id,
                conn_id
            );
            return false;
        };
        connection.outbox().close();

        let mut out = Vec::new();
        if let Some(session) = self.calls.remove_of(client_id) {
            if let Some(peer) = session.peer_of(client_id) {
                sink_info!(
                    self.log,
                    "call {} <-> {} ended by disconnect of {}",
                    session.initiator(),
                    session.target(),
                    client_id
                );
                out.push(OutgoingMsg::new(
                    peer,
                    SignalingMsg::EndCall {
                        peer: Some(client_id.to_owned()),
                    },
                ));
            }
        }

        sink_info!(
            self.log,
            "client {} unregistered (conn {}, {} online)",
            client_id,
            conn_id,
            self.registry.len()
        );

        out.extend(presence::broadcast_online_users(&self.registry));
        self.deliver(out);
        true
    }

    // ---- Inbound messages -----------------------------------------------

    /// Main entrypoint: handle a message coming from `from`.
    pub fn handle_from_client(&mut self, from: &str, msg: SignalingMsg) {
        if !self.registry.contains(from) {
            sink_warn!(
                self.log,
                "dropping {} from unregistered client {}",
                msg.name(),
                from
            );
            return;
        }

        sink_trace!(self.log, "{} from {}", msg.name(), from);
        let out = self.dispatch(from, msg);
        self.deliver(out);
    }

    /// Answers a frame that could not be parsed. The connection stays open.
    pub fn reject_malformed(&mut self, from: &str, reason: &str) {
        sink_warn!(self.log, "malformed frame from {}: {}", from, reason);
        self.deliver(vec![OutgoingMsg::new(from, SignalingMsg::error(reason))]);
    }

    /// Computes the messages one inbound message produces, mutating the
    /// call table on the way.
    pub fn dispatch(&mut self, from: &str, msg: SignalingMsg) -> Vec<OutgoingMsg> {
        match msg {
            SignalingMsg::State { phase: None } => vec![OutgoingMsg::new(
                from,
                SignalingMsg::State {
                    phase: Some(self.calls.phase_of(from)),
                },
            )],

            SignalingMsg::CallRequest { target } => self.handle_call_request(from, target),

            SignalingMsg::CallResponse { decision, peer } => {
                self.handle_call_response(from, decision, &peer)
            }

            SignalingMsg::Offer { .. } => self.relay(from, CallSignal::Offer, msg),
            SignalingMsg::Answer { .. } => self.relay(from, CallSignal::Answer, msg),
            SignalingMsg::IceCandidate(_) => self.relay(from, CallSignal::Candidate, msg),

            SignalingMsg::EndCall { peer } => self.handle_end_call(from, peer.as_deref()),

            SignalingMsg::State { phase: Some(_) }
            | SignalingMsg::IncomingCall { .. }
            | SignalingMsg::CallAccepted { .. }
            | SignalingMsg::CallRejected { .. }
            | SignalingMsg::OnlineUsers { .. }
            | SignalingMsg::Error { .. } => {
                sink_warn!(
                    self.log,
                    "ignoring server-only {} from client {}",
                    msg.name(),
                    from
                );
                Vec::new()
            }
        }
    }

    // ---- Individual handlers ---------------------------------------------

    fn handle_call_request(&mut self, from: &str, target: ClientId) -> Vec<OutgoingMsg> {
        if target != from && !self.registry.contains(&target) {
            return self.refuse_call(from, CallError::TargetOffline(target));
        }

        match self.calls.create(from, &target) {
            Ok(_) => {
                sink_info!(self.log, "call requested: {} -> {}", from, target);
                vec![OutgoingMsg::new(
                    target,
                    SignalingMsg::IncomingCall {
                        caller: from.to_owned(),
                    },
                )]
            }
            Err(e) => self.refuse_call(from, e),
        }
    }

    fn refuse_call(&self, from: &str, err: CallError) -> Vec<OutgoingMsg> {
        sink_info!(self.log, "call request from {} refused: {}", from, err);
        vec![OutgoingMsg::new(from, SignalingMsg::error(err.to_string()))]
    }

    fn handle_call_response(
        &mut self,
        from: &str,
        decision: CallDecision,
        peer: &str,
    ) -> Vec<OutgoingMsg> {
        let Some(session) = self.calls.session_of_mut(from) else {
            sink_debug!(
                self.log,
                "CALL_RESPONSE {} from {} dropped: no session",
                decision.as_str(),
                from
            );
            return Vec::new();
        };

        if session.peer_of(from) != Some(peer) {
            sink_debug!(
                self.log,
                "CALL_RESPONSE from {} names {} but the session is with {:?}",
                from,
                peer,
                session.peer_of(from)
            );
            return Vec::new();
        }

        match decision {
            CallDecision::Accept => match session.advance(from, CallSignal::Accept) {
                Ok(_) => {
                    sink_info!(self.log, "call accepted: {} -> {}", peer, from);
                    vec![OutgoingMsg::new(
                        peer,
                        SignalingMsg::CallAccepted {
                            peer: from.to_owned(),
                        },
                    )]
                }
                Err(stale) => {
                    sink_debug!(self.log, "accept from {} dropped: {}", from, stale);
                    Vec::new()
                }
            },
            CallDecision::Reject => {
                if session.state() != CallState::Requested || session.target() != from {
                    sink_debug!(
                        self.log,
                        "reject from {} dropped in state {:?}",
                        from,
                        session.state()
                    );
                    return Vec::new();
                }
                self.calls.remove_of(from);
                sink_info!(self.log, "call rejected: {} -> {}", peer, from);
                vec![OutgoingMsg::new(
                    peer,
                    SignalingMsg::CallRejected {
                        peer: from.to_owned(),
                    },
                )]
            }
        }
    }

    /// Forwards OFFER / ANSWER / ICE to the other party if the session state
    /// allows it; otherwise drops the message.
    fn relay(&mut self, from: &str, signal: CallSignal, msg: SignalingMsg) -> Vec<OutgoingMsg> {
        let Some(session) = self.calls.session_of_mut(from) else {
            sink_debug!(
                self.log,
                "{} from {} dropped: no session",
                msg.name(),
                from
            );
            return Vec::new();
        };

        let Some(peer) = session.peer_of(from).map(str::to_owned) else {
            return Vec::new();
        };

        match session.advance(from, signal) {
            Ok(state) => {
                sink_debug!(
                    self.log,
                    "relaying {} {} -> {} (now {:?})",
                    msg.name(),
                    from,
                    peer,
                    state
                );
                vec![OutgoingMsg::new(peer, msg)]
            }
            Err(stale) => {
                sink_debug!(
                    self.log,
                    "{} from {} dropped: {}",
                    msg.name(),
                    from,
                    stale
                );
                Vec::new()
            }
        }
    }

    fn handle_end_call(&mut self, from: &str, named_peer: Option<&str>) -> Vec<OutgoingMsg> {
        let Some(peer) = self
            .calls
            .session_of(from)
            .and_then(|s| s.peer_of(from))
            .map(str::to_owned)
        else {
            sink_debug!(self.log, "END_CALL from {} ignored: no session", from);
            return Vec::new();
        };

        if named_peer.is_some_and(|named| named != peer) {
            sink_debug!(
                self.log,
                "END_CALL from {} names {:?} but the session is with {}",
                from,
                named_peer,
                peer
            );
            return Vec::new();
        }

        self.calls.remove_of(from);
        sink_info!(self.log, "call {} <-> {} ended by {}", from, peer, from);

        vec![
            OutgoingMsg::new(
                peer.clone(),
                SignalingMsg::EndCall {
                    peer: Some(from.to_owned()),
                },
            ),
            OutgoingMsg::new(from, SignalingMsg::EndCall { peer: Some(peer) }),
        ]
    }

    fn deliver(&self, out: Vec<OutgoingMsg>) {
        for OutgoingMsg { target, msg } in out {
            let name = msg.name();
            if let Err(e) = self.registry.send_to(&target, msg) {
                sink_warn!(self.log, "failed to deliver {}: {}", name, e);
            }
        }
    }
}
