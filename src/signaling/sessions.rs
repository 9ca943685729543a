use std::collections::HashMap;

use thiserror::Error;

use crate::signaling::errors::CallError;
use crate::signaling::protocol::{CallPhase, ClientId};

/// Where a call between two clients stands.
///
/// `Terminated` is only ever seen on a session that was just removed from the
/// table; a live table holds the other four states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Requested,
    Accepted,
    OfferSent,
    Active,
    Terminated,
}

impl From<CallState> for CallPhase {
    fn from(state: CallState) -> Self {
        match state {
            CallState::Requested => CallPhase::Requested,
            CallState::Accepted => CallPhase::Accepted,
            CallState::OfferSent => CallPhase::OfferSent,
            CallState::Active => CallPhase::Active,
            CallState::Terminated => CallPhase::Idle,
        }
    }
}

/// Signaling steps that move a session forward (or, for candidates, require
/// it to be far enough along).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSignal {
    Accept,
    Offer,
    Answer,
    Candidate,
}

/// A signal that does not fit the session's current state or came from the
/// wrong party. The router drops these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{signal:?} not allowed in state {state:?}")]
pub struct StaleSignal {
    pub signal: CallSignal,
    pub state: CallState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    initiator: ClientId,
    target: ClientId,
    state: CallState,
}

impl CallSession {
    fn new(initiator: ClientId, target: ClientId) -> Self {
        Self {
            initiator,
            target,
            state: CallState::Requested,
        }
    }

    pub fn initiator(&self) -> &str {
        &self.initiator
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// The other party, if `id` is one of the two.
    pub fn peer_of(&self, id: &str) -> Option<&str> {
        if self.initiator == id {
            Some(&self.target)
        } else if self.target == id {
            Some(&self.initiator)
        } else {
            None
        }
    }

    /// Applies one step of the handshake sent by `sender`.
    ///
    /// - Accept: target only, from Requested.
    /// - Offer: initiator only, from Accepted.
    /// - Answer: target only, from OfferSent.
    /// - Candidate: either party, in OfferSent or Active; state unchanged.
    pub fn advance(&mut self, sender: &str, signal: CallSignal) -> Result<CallState, StaleSignal> {
        let from_initiator = sender == self.initiator;
        let from_target = sender == self.target;

        let next = match (signal, self.state) {
            (CallSignal::Accept, CallState::Requested) if from_target => CallState::Accepted,
            (CallSignal::Offer, CallState::Accepted) if from_initiator => CallState::OfferSent,
            (CallSignal::Answer, CallState::OfferSent) if from_target => CallState::Active,
            (CallSignal::Candidate, CallState::OfferSent | CallState::Active)
                if from_initiator || from_target =>
            {
                self.state
            }
            _ => {
                return Err(StaleSignal {
                    signal,
                    state: self.state,
                });
            }
        };

        self.state = next;
        Ok(next)
    }
}

/// Unordered pair of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey(ClientId, ClientId);

impl PairKey {
    fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_owned(), b.to_owned())
        } else {
            Self(b.to_owned(), a.to_owned())
        }
    }
}

/// All calls that are ringing, negotiating or established.
///
/// Holds at most one session per pair and at most one session per client.
#[derive(Debug, Default)]
pub struct CallTable {
    by_pair: HashMap<PairKey, CallSession>,
    by_client: HashMap<ClientId, PairKey>,
}

impl CallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a Requested session from `initiator` to `target`.
    ///
    /// Whether `target` is online is the router's concern; the table only
    /// enforces one call per client.
    pub fn create(&mut self, initiator: &str, target: &str) -> Result<&CallSession, CallError> {
        if initiator == target {
            return Err(CallError::SelfCall);
        }
        if self.by_client.contains_key(initiator) {
            return Err(CallError::CallerBusy);
        }
        if self.by_client.contains_key(target) {
            return Err(CallError::TargetBusy(target.to_owned()));
        }

        let key = PairKey::new(initiator, target);
        self.by_client.insert(initiator.to_owned(), key.clone());
        self.by_client.insert(target.to_owned(), key.clone());
        let session = self
            .by_pair
            .entry(key)
            .or_insert_with(|| CallSession::new(initiator.to_owned(), target.to_owned()));
        Ok(session)
    }

    pub fn session_of(&self, id: &str) -> Option<&CallSession> {
        self.by_client.get(id).and_then(|key| self.by_pair.get(key))
    }

    pub fn session_of_mut(&mut self, id: &str) -> Option<&mut CallSession> {
        let key = self.by_client.get(id)?;
        self.by_pair.get_mut(key)
    }

    /// Removes the session `id` is party to, for both parties at once.
    ///
    /// The returned session is marked Terminated.
    pub fn remove_of(&mut self, id: &str) -> Option<CallSession> {
        let key = self.by_client.get(id)?.clone();
        let mut session = self.by_pair.remove(&key)?;
        self.by_client.remove(&session.initiator);
        self.by_client.remove(&session.target);
        session.state = CallState::Terminated;
        Some(session)
    }

    /// Call phase of `id`, `Idle` when it is in no session.
    pub fn phase_of(&self, id: &str) -> CallPhase {
        self.session_of(id)
            .map_or(CallPhase::Idle, |s| s.state().into())
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}
