use std::collections::BTreeMap;

use crate::signaling::errors::{RegisterError, SendError};
use crate::signaling::outbox::{Outbox, OutboxError};
use crate::signaling::protocol::{ClientId, SignalingMsg};
use crate::signaling::types::ConnId;

/// The live outbound side of one registered client.
#[derive(Clone)]
pub struct ClientConnection {
    conn_id: ConnId,
    outbox: Outbox,
}

impl ClientConnection {
    pub fn new(conn_id: ConnId, outbox: Outbox) -> Self {
        Self { conn_id, outbox }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

/// Which client identifiers are reachable right now, and how.
///
/// Owned by the server loop; nothing else mutates it. Keys are kept sorted so
/// presence snapshots list identifiers in a stable order.
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: BTreeMap<ClientId, ClientConnection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// First registration wins; a live identifier is never replaced.
    pub fn register(
        &mut self,
        id: ClientId,
        connection: ClientConnection,
    ) -> Result<(), RegisterError> {
        if self.clients.contains_key(&id) {
            return Err(RegisterError::DuplicateIdentifier(id));
        }
        self.clients.insert(id, connection);
        Ok(())
    }

    /// Removes `id` if it is still held by connection `conn_id`.
    ///
    /// Idempotent: a second call, or a call for a connection that was never
    /// registered, returns `None` and changes nothing.
    pub fn unregister(&mut self, id: &str, conn_id: ConnId) -> Option<ClientConnection> {
        match self.clients.get(id) {
            Some(conn) if conn.conn_id == conn_id => self.clients.remove(id),
            _ => None,
        }
    }

    /// Queues `msg` for `id` without waiting on the recipient.
    pub fn send_to(&self, id: &str, msg: SignalingMsg) -> Result<(), SendError> {
        let conn = self
            .clients
            .get(id)
            .ok_or_else(|| SendError::NotFound(id.to_owned()))?;

        conn.outbox.push(msg).map_err(|e| match e {
            OutboxError::Full => SendError::Full(id.to_owned()),
            OutboxError::Closed => SendError::Closed(id.to_owned()),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Sorted snapshot of every registered identifier.
    pub fn list_ids(&self) -> Vec<ClientId> {
        self.clients.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn conn(conn_id: ConnId) -> ClientConnection {
        ClientConnection::new(conn_id, Outbox::new(4))
    }

    #[test]
    fn duplicate_identifier_is_rejected_and_first_stays() {
        let mut reg = ConnectionRegistry::new();
        reg.register("alice".into(), conn(1)).unwrap();

        let err = reg.register("alice".into(), conn(2)).unwrap_err();
        assert_eq!(err, RegisterError::DuplicateIdentifier("alice".into()));
        assert_eq!(reg.len(), 1);

        // The surviving entry is still connection 1.
        assert!(reg.unregister("alice", 2).is_none());
        assert_eq!(reg.unregister("alice", 1).map(|c| c.conn_id()), Some(1));
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut reg = ConnectionRegistry::new();
        reg.register("bob".into(), conn(7)).unwrap();

        assert!(reg.unregister("bob", 7).is_some());
        assert!(reg.unregister("bob", 7).is_none());
        assert!(reg.unregister("nobody", 1).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn list_ids_tracks_every_change() {
        let mut reg = ConnectionRegistry::new();
        reg.register("carol".into(), conn(1)).unwrap();
        reg.register("alice".into(), conn(2)).unwrap();
        assert_eq!(reg.list_ids(), vec!["alice".to_string(), "carol".to_string()]);

        reg.unregister("carol", 1);
        assert_eq!(reg.list_ids(), vec!["alice".to_string()]);

        reg.register("carol".into(), conn(3)).unwrap();
        assert_eq!(reg.list_ids(), vec!["alice".to_string(), "carol".to_string()]);
    }

    #[test]
    fn send_to_queues_on_the_target_outbox() {
        let mut reg = ConnectionRegistry::new();
        let c = conn(1);
        let outbox = c.outbox().clone();
        reg.register("alice".into(), c).unwrap();

        let msg = SignalingMsg::IncomingCall {
            caller: "bob".into(),
        };
        reg.send_to("alice", msg.clone()).unwrap();
        assert_eq!(outbox.drain(), vec![msg]);

        assert_eq!(
            reg.send_to("zed", SignalingMsg::error("x")),
            Err(SendError::NotFound("zed".into()))
        );

        outbox.close();
        assert_eq!(
            reg.send_to("alice", SignalingMsg::error("x")),
            Err(SendError::Closed("alice".into()))
        );
    }
}
