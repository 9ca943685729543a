use crate::signaling::protocol::SignalingMsg;
use crate::signaling::registry::ConnectionRegistry;
use crate::signaling::types::OutgoingMsg;

/// Composes the presence broadcast that follows every registry change.
///
/// Each registered client gets the full list of online identifiers minus
/// itself. This is a full snapshot, not a delta.
pub fn broadcast_online_users(registry: &ConnectionRegistry) -> Vec<OutgoingMsg> {
    let all_ids = registry.list_ids();

    all_ids
        .iter()
        .map(|recipient| {
            // Filter: everyone except the recipient
            let users = all_ids
                .iter()
                .filter(|id| *id != recipient)
                .cloned()
                .collect();
            OutgoingMsg::new(recipient.clone(), SignalingMsg::OnlineUsers { users })
        })
        .collect()
}
