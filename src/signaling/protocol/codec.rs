use super::{
    CallDecision, CallPhase, ClientId, IceCandidate, LIST_SEP, MsgType, ProtoError, SignalingMsg,
    is_valid_client_id,
};

// ---- Encode ---------------------------------------------------------------

pub fn encode_msg(msg: &SignalingMsg) -> String {
    use SignalingMsg::*;
    let tag = msg.msg_type().as_str();

    match msg {
        State { phase: None } => tag.to_owned(),
        State { phase: Some(p) } => format!("{tag} {}", p.as_str()),
        CallRequest { target } => format!("{tag} {target}"),
        CallResponse { decision, peer } => format!("{tag} {} {peer}", decision.as_str()),
        IncomingCall { caller } => format!("{tag} {caller}"),
        CallAccepted { peer } | CallRejected { peer } => format!("{tag} {peer}"),
        OnlineUsers { users } if users.is_empty() => tag.to_owned(),
        OnlineUsers { users } => {
            let sep = LIST_SEP.to_string();
            format!("{tag} {}", users.join(&sep))
        }
        Offer { sdp } | Answer { sdp } => format!("{tag} {sdp}"),
        IceCandidate(c) => format!("{tag} {c}"),
        EndCall { peer: None } => tag.to_owned(),
        EndCall { peer: Some(p) } => format!("{tag} {p}"),
        Error { message } => format!("{tag} {message}"),
    }
}

// ---- Decode ---------------------------------------------------------------

/// Parses one text frame.
///
/// Only the leading token is matched case-insensitively. Everything after the
/// single whitespace character that ends it is the argument; `OFFER`, `ANSWER`
/// and `ICE` keep that argument byte-for-byte.
pub fn decode_msg(text: &str) -> Result<SignalingMsg, ProtoError> {
    let text = text.trim_start();
    if text.is_empty() {
        return Err(ProtoError::Empty);
    }

    let (token, rest) = match text.find(char::is_whitespace) {
        Some(i) => {
            let ws_len = text[i..].chars().next().map_or(1, char::len_utf8);
            (&text[..i], &text[i + ws_len..])
        }
        None => (text, ""),
    };

    let msg_type =
        MsgType::from_token(token).ok_or_else(|| ProtoError::UnknownCommand(token.to_owned()))?;
    let cmd = msg_type.as_str();

    let msg = match msg_type {
        MsgType::State => {
            let arg = rest.trim();
            if arg.is_empty() {
                SignalingMsg::State { phase: None }
            } else {
                let phase = CallPhase::parse(arg).ok_or(ProtoError::InvalidArgument {
                    command: cmd,
                    what: "state name",
                })?;
                SignalingMsg::State { phase: Some(phase) }
            }
        }
        MsgType::CallRequest => SignalingMsg::CallRequest {
            target: single_id(cmd, rest, "target id")?,
        },
        MsgType::CallResponse => {
            let mut words = rest.split_whitespace();
            let decision = words.next().ok_or(ProtoError::MissingArgument {
                command: cmd,
                what: "accept|reject",
            })?;
            let decision = CallDecision::parse(decision).ok_or(ProtoError::InvalidArgument {
                command: cmd,
                what: "decision (expected accept or reject)",
            })?;
            let peer = words.next().ok_or(ProtoError::MissingArgument {
                command: cmd,
                what: "peer id",
            })?;
            if words.next().is_some() {
                return Err(ProtoError::InvalidArgument {
                    command: cmd,
                    what: "trailing arguments",
                });
            }
            SignalingMsg::CallResponse {
                decision,
                peer: peer.to_owned(),
            }
        }
        MsgType::IncomingCall => SignalingMsg::IncomingCall {
            caller: single_id(cmd, rest, "caller id")?,
        },
        MsgType::CallAccepted => SignalingMsg::CallAccepted {
            peer: single_id(cmd, rest, "peer id")?,
        },
        MsgType::CallRejected => SignalingMsg::CallRejected {
            peer: single_id(cmd, rest, "peer id")?,
        },
        MsgType::OnlineUsers => SignalingMsg::OnlineUsers {
            users: rest
                .trim()
                .split(LIST_SEP)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .collect(),
        },
        MsgType::Offer => SignalingMsg::Offer {
            sdp: opaque_payload(cmd, rest, "session description")?,
        },
        MsgType::Answer => SignalingMsg::Answer {
            sdp: opaque_payload(cmd, rest, "session description")?,
        },
        MsgType::IceCandidate => {
            let arg = opaque_payload(cmd, rest, "candidate")?;
            let candidate = IceCandidate::parse(&arg).ok_or(ProtoError::InvalidArgument {
                command: cmd,
                what: "candidate (expected mid|index|candidate)",
            })?;
            SignalingMsg::IceCandidate(candidate)
        }
        MsgType::EndCall => {
            let arg = rest.trim();
            let peer = if arg.is_empty() {
                None
            } else {
                Some(single_id(cmd, arg, "peer id")?)
            };
            SignalingMsg::EndCall { peer }
        }
        MsgType::Error => SignalingMsg::Error {
            message: rest.trim().to_owned(),
        },
    };

    Ok(msg)
}

fn single_id(
    command: &'static str,
    rest: &str,
    what: &'static str,
) -> Result<ClientId, ProtoError> {
    let id = rest.trim();
    if id.is_empty() {
        return Err(ProtoError::MissingArgument { command, what });
    }
    if !is_valid_client_id(id) {
        return Err(ProtoError::InvalidArgument { command, what });
    }
    Ok(id.to_owned())
}

fn opaque_payload(
    command: &'static str,
    rest: &str,
    what: &'static str,
) -> Result<String, ProtoError> {
    if rest.trim().is_empty() {
        return Err(ProtoError::MissingArgument { command, what });
    }
    Ok(rest.to_owned())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const SDP: &str = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

    #[test]
    fn call_handshake_commands_parse() {
        assert_eq!(
            decode_msg("CALL_REQUEST bob").unwrap(),
            SignalingMsg::CallRequest {
                target: "bob".into()
            }
        );
        assert_eq!(
            decode_msg("call_response ACCEPT alice").unwrap(),
            SignalingMsg::CallResponse {
                decision: CallDecision::Accept,
                peer: "alice".into()
            }
        );
        assert_eq!(
            decode_msg("Call_Response reject alice\r\n").unwrap(),
            SignalingMsg::CallResponse {
                decision: CallDecision::Reject,
                peer: "alice".into()
            }
        );
    }

    #[test]
    fn offer_payload_is_kept_verbatim() {
        let frame = format!("OFFER {SDP}");
        match decode_msg(&frame).unwrap() {
            SignalingMsg::Offer { sdp } => assert_eq!(sdp, SDP),
            other => panic!("expected Offer, got {other:?}"),
        }
        // Leading spaces inside the payload belong to the payload.
        match decode_msg("answer   spaced").unwrap() {
            SignalingMsg::Answer { sdp } => assert_eq!(sdp, "  spaced"),
            other => panic!("expected Answer, got {other:?}"),
        }
    }

    #[test]
    fn encoded_offer_reproduces_the_received_frame() {
        let frame = format!("OFFER {SDP}");
        let msg = decode_msg(&frame).unwrap();
        assert_eq!(encode_msg(&msg), frame);
    }

    #[test]
    fn ice_candidate_splits_on_the_separator() {
        let frame = "ICE audio|1|candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx";
        let msg = decode_msg(frame).unwrap();
        match &msg {
            SignalingMsg::IceCandidate(c) => {
                assert_eq!(c.sdp_mid(), "audio");
                assert_eq!(c.sdp_mline_index(), "1");
            }
            other => panic!("expected IceCandidate, got {other:?}"),
        }
        assert_eq!(encode_msg(&msg), frame);
    }

    #[test]
    fn ice_argument_is_re_encoded_byte_for_byte() {
        for frame in [
            "ICE audio|01|candidate:1 1 udp 1 10.0.0.1 9 typ host",
            "ICE audio| 1|candidate:1 1 udp 1 10.0.0.1 9 typ host ",
            "ICE 0|x|candidate:1|with|bars",
        ] {
            let msg = decode_msg(frame).unwrap();
            assert_eq!(encode_msg(&msg), frame);
        }
    }

    #[test]
    fn online_users_list_and_empty_list() {
        let msg = SignalingMsg::OnlineUsers {
            users: vec!["alice".into(), "carol".into()],
        };
        assert_eq!(encode_msg(&msg), "ONLINE_USERS alice,carol");
        assert_eq!(decode_msg("ONLINE_USERS alice,carol").unwrap(), msg);

        let empty = SignalingMsg::OnlineUsers { users: vec![] };
        assert_eq!(encode_msg(&empty), "ONLINE_USERS");
        assert_eq!(decode_msg("ONLINE_USERS").unwrap(), empty);
    }

    #[test]
    fn state_query_and_answer() {
        assert_eq!(
            decode_msg("state").unwrap(),
            SignalingMsg::State { phase: None }
        );
        let answer = SignalingMsg::State {
            phase: Some(CallPhase::OfferSent),
        };
        assert_eq!(encode_msg(&answer), "STATE OFFER_SENT");
        assert_eq!(decode_msg("STATE offer_sent").unwrap(), answer);
        assert!(matches!(
            decode_msg("STATE RINGING"),
            Err(ProtoError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn end_call_peer_is_optional() {
        assert_eq!(
            decode_msg("END_CALL").unwrap(),
            SignalingMsg::EndCall { peer: None }
        );
        assert_eq!(
            decode_msg("END_CALL bob").unwrap(),
            SignalingMsg::EndCall {
                peer: Some("bob".into())
            }
        );
    }

    #[test]
    fn malformed_messages_are_reported() {
        assert_eq!(decode_msg("   "), Err(ProtoError::Empty));
        assert_eq!(
            decode_msg("HELLO world"),
            Err(ProtoError::UnknownCommand("HELLO".into()))
        );
        assert!(matches!(
            decode_msg("CALL_REQUEST"),
            Err(ProtoError::MissingArgument { .. })
        ));
        assert!(matches!(
            decode_msg("CALL_REQUEST bob carol"),
            Err(ProtoError::InvalidArgument { .. })
        ));
        assert!(matches!(
            decode_msg("CALL_RESPONSE maybe alice"),
            Err(ProtoError::InvalidArgument { .. })
        ));
        assert!(matches!(
            decode_msg("CALL_RESPONSE accept"),
            Err(ProtoError::MissingArgument { .. })
        ));
        assert!(matches!(
            decode_msg("OFFER"),
            Err(ProtoError::MissingArgument { .. })
        ));
        assert!(matches!(
            decode_msg("ICE candidate:1 1 udp 1 10.0.0.1 9 typ host"),
            Err(ProtoError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn error_message_keeps_spaces() {
        let msg = SignalingMsg::error("user carol is not online");
        assert_eq!(encode_msg(&msg), "ERROR user carol is not online");
        assert_eq!(decode_msg("ERROR user carol is not online").unwrap(), msg);
    }
}
