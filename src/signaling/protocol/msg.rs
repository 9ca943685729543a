// ---- Public message enum --------------------------------------------------

use crate::signaling::protocol::{CallDecision, CallPhase, ClientId, IceCandidate, MsgType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMsg {
    /// `None` is a query from a client; `Some` is the relay's answer.
    State { phase: Option<CallPhase> },

    // Consent handshake
    CallRequest { target: ClientId },
    CallResponse { decision: CallDecision, peer: ClientId },
    IncomingCall { caller: ClientId },
    CallAccepted { peer: ClientId },
    CallRejected { peer: ClientId },

    // Presence (server → clients)
    OnlineUsers { users: Vec<ClientId> },

    // Session description exchange; payloads are opaque and relayed verbatim.
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate(IceCandidate),

    /// A client may omit the peer; the relay always names it.
    EndCall { peer: Option<ClientId> },

    Error { message: String },
}

impl SignalingMsg {
    pub fn msg_type(&self) -> MsgType {
        use SignalingMsg::*;
        match self {
            State { .. } => MsgType::State,
            CallRequest { .. } => MsgType::CallRequest,
            CallResponse { .. } => MsgType::CallResponse,
            IncomingCall { .. } => MsgType::IncomingCall,
            CallAccepted { .. } => MsgType::CallAccepted,
            CallRejected { .. } => MsgType::CallRejected,
            OnlineUsers { .. } => MsgType::OnlineUsers,
            Offer { .. } => MsgType::Offer,
            Answer { .. } => MsgType::Answer,
            IceCandidate(_) => MsgType::IceCandidate,
            EndCall { .. } => MsgType::EndCall,
            Error { .. } => MsgType::Error,
        }
    }

    /// Short name for logging; never includes SDP or candidate payloads.
    pub fn name(&self) -> &'static str {
        self.msg_type().as_str()
    }

    /// Messages that a newer message of the same kind makes obsolete, so a
    /// congested outbox may drop them.
    pub fn is_low_priority(&self) -> bool {
        matches!(self, SignalingMsg::OnlineUsers { .. })
    }

    pub fn error(message: impl Into<String>) -> Self {
        SignalingMsg::Error {
            message: message.into(),
        }
    }
}
