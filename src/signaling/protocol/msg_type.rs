// ---- Command tag ----------------------------------------------------------

/// Leading token of every message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MsgType {
    State,
    CallRequest,
    CallResponse,
    IncomingCall,
    CallAccepted,
    CallRejected,
    OnlineUsers,
    Offer,
    Answer,
    IceCandidate,
    EndCall,
    Error,
}

impl MsgType {
    pub const ALL: [MsgType; 12] = [
        MsgType::State,
        MsgType::CallRequest,
        MsgType::CallResponse,
        MsgType::IncomingCall,
        MsgType::CallAccepted,
        MsgType::CallRejected,
        MsgType::OnlineUsers,
        MsgType::Offer,
        MsgType::Answer,
        MsgType::IceCandidate,
        MsgType::EndCall,
        MsgType::Error,
    ];

    /// Case-insensitive match on the leading token.
    pub fn from_token(token: &str) -> Option<MsgType> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }

    pub fn as_str(self) -> &'static str {
        use MsgType::*;
        match self {
            State => "STATE",
            CallRequest => "CALL_REQUEST",
            CallResponse => "CALL_RESPONSE",
            IncomingCall => "INCOMING_CALL",
            CallAccepted => "CALL_ACCEPTED",
            CallRejected => "CALL_REJECTED",
            OnlineUsers => "ONLINE_USERS",
            Offer => "OFFER",
            Answer => "ANSWER",
            IceCandidate => "ICE",
            EndCall => "END_CALL",
            Error => "ERROR",
        }
    }

    /// Commands only the relay may send.
    pub fn is_server_only(self) -> bool {
        matches!(
            self,
            MsgType::IncomingCall
                | MsgType::CallAccepted
                | MsgType::CallRejected
                | MsgType::OnlineUsers
                | MsgType::Error
        )
    }
}
