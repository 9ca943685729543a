use std::fmt;

use crate::signaling::protocol::constants::{FIELD_SEP, LIST_SEP, MAX_CLIENT_ID_LEN};

// ---- Basic types ----------------------------------------------------------

/// Caller-chosen identifier, taken from the connection URL path.
pub type ClientId = String;

/// Whether `id` can be used as a client identifier: non-empty, at most
/// `MAX_CLIENT_ID_LEN` bytes, and free of whitespace, `/` and the wire
/// separators.
pub fn is_valid_client_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CLIENT_ID_LEN
        && !id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/' || c == LIST_SEP || c == FIELD_SEP)
}

/// Answer carried by `CALL_RESPONSE`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallDecision {
    Accept,
    Reject,
}

impl CallDecision {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("accept") {
            Some(Self::Accept)
        } else if s.eq_ignore_ascii_case("reject") {
            Some(Self::Reject)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

/// A client's call state as reported by `STATE`.
///
/// `Idle` means the client is party to no call session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallPhase {
    Idle,
    Requested,
    Accepted,
    OfferSent,
    Active,
}

impl CallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Requested => "REQUESTED",
            Self::Accepted => "ACCEPTED",
            Self::OfferSent => "OFFER_SENT",
            Self::Active => "ACTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Idle,
            Self::Requested,
            Self::Accepted,
            Self::OfferSent,
            Self::Active,
        ]
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(s))
    }
}

/// One connectivity candidate as relayed by `ICE`:
/// `<sdpMid>|<sdpMLineIndex>|<candidate>`.
///
/// The argument is kept exactly as received and re-sent unchanged. The relay
/// only requires the two field separators; it never looks inside the fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IceCandidate {
    raw: String,
    mid_end: usize,
    index_end: usize,
}

impl IceCandidate {
    /// Builds a candidate from its three fields.
    pub fn new(sdp_mid: &str, sdp_mline_index: impl fmt::Display, candidate: &str) -> Self {
        let index = sdp_mline_index.to_string();
        let mid_end = sdp_mid.len();
        let index_end = mid_end + FIELD_SEP.len_utf8() + index.len();
        Self {
            raw: format!("{sdp_mid}{FIELD_SEP}{index}{FIELD_SEP}{candidate}"),
            mid_end,
            index_end,
        }
    }

    /// Accepts an `ICE` argument as-is, as long as it has the two
    /// separators. The candidate field keeps any further separators.
    pub fn parse(arg: &str) -> Option<Self> {
        let mid_end = arg.find(FIELD_SEP)?;
        let index_start = mid_end + FIELD_SEP.len_utf8();
        let index_end = index_start + arg[index_start..].find(FIELD_SEP)?;
        Some(Self {
            raw: arg.to_owned(),
            mid_end,
            index_end,
        })
    }

    /// The argument exactly as it travels on the wire.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn sdp_mid(&self) -> &str {
        &self.raw[..self.mid_end]
    }

    /// Media line index, untouched (no numeric normalisation).
    pub fn sdp_mline_index(&self) -> &str {
        &self.raw[self.mid_end + FIELD_SEP.len_utf8()..self.index_end]
    }

    pub fn candidate(&self) -> &str {
        &self.raw[self.index_end + FIELD_SEP.len_utf8()..]
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
