use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::protocol::{ConnectionId, ProfileId, RoomId, ServerFrame};

/// One live socket. `room_id == None` means the connection sits in the
/// lobby pseudo-channel; a set `room_id` attaches it to that room's
/// broadcast channel.
#[derive(Debug, Clone)]
pub(crate) struct ClientConnection {
    pub sender: mpsc::Sender<Arc<ServerFrame>>,
    pub profile_id: Option<ProfileId>,
    pub room_id: Option<RoomId>,
}

/// Connection table. Registration hands out the ephemeral `ConnectionId`;
/// identity (`profile_id`) attaches later, when the first join resolves a
/// profile.
pub struct ConnectionManager {
    clients: DashMap<ConnectionId, ClientConnection>,
    outbound_queue_size: usize,
}

impl ConnectionManager {
    pub fn new(outbound_queue_size: usize) -> Self {
        Self {
            clients: DashMap::new(),
            outbound_queue_size: outbound_queue_size.max(1),
        }
    }

    /// Bounded queue size for one connection's outbound channel.
    pub fn outbound_queue_size(&self) -> usize {
        self.outbound_queue_size
    }

    pub fn register(&self, sender: mpsc::Sender<Arc<ServerFrame>>) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        self.clients.insert(
            connection_id,
            ClientConnection {
                sender,
                profile_id: None,
                room_id: None,
            },
        );
        tracing::info!(%connection_id, "Client registered");
        connection_id
    }

    pub fn remove(&self, connection_id: &ConnectionId) -> bool {
        self.clients.remove(connection_id).is_some()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.clients.contains_key(connection_id)
    }

    pub fn set_profile(&self, connection_id: &ConnectionId, profile_id: ProfileId) {
        if let Some(mut client) = self.clients.get_mut(connection_id) {
            client.profile_id = Some(profile_id);
        }
    }

    pub fn profile_of(&self, connection_id: &ConnectionId) -> Option<ProfileId> {
        self.clients
            .get(connection_id)
            .and_then(|c| c.profile_id.clone())
    }

    pub fn assign_to_room(&self, connection_id: &ConnectionId, room_id: RoomId) {
        if let Some(mut client) = self.clients.get_mut(connection_id) {
            client.room_id = Some(room_id);
        }
    }

    /// Detach from any room channel, returning the connection to the lobby.
    pub fn clear_room(&self, connection_id: &ConnectionId) {
        if let Some(mut client) = self.clients.get_mut(connection_id) {
            client.room_id = None;
        }
    }

    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.clients
            .get(connection_id)
            .and_then(|c| c.room_id.clone())
    }

    /// Try to enqueue one frame. A full queue means the receiver is not
    /// draining within the backpressure budget; the connection is treated
    /// as lost and the caller routes it into the disconnect path.
    pub fn try_send(&self, connection_id: &ConnectionId, frame: Arc<ServerFrame>) -> bool {
        let Some(client) = self.clients.get(connection_id) else {
            return false;
        };
        match client.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%connection_id, "Outbound queue full; treating connection as lost");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Connections currently attached to a room's broadcast channel.
    pub fn connections_in_room(&self, room_id: &str) -> Vec<ConnectionId> {
        self.clients
            .iter()
            .filter(|entry| entry.value().room_id.as_deref() == Some(room_id))
            .map(|entry| *entry.key())
            .collect()
    }

    /// All live connection ids (room occupants and lobby alike).
    pub fn all_connections(&self) -> Vec<ConnectionId> {
        self.clients.iter().map(|entry| *entry.key()).collect()
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Distinct rooms with at least one attached connection.
    pub fn attached_room_count(&self) -> usize {
        let mut rooms = std::collections::HashSet::new();
        for entry in self.clients.iter() {
            if let Some(room_id) = &entry.value().room_id {
                rooms.insert(room_id.clone());
            }
        }
        rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(capacity: usize) -> (
        mpsc::Sender<Arc<ServerFrame>>,
        mpsc::Receiver<Arc<ServerFrame>>,
    ) {
        mpsc::channel(capacity)
    }

    #[test]
    fn register_assign_and_clear_room() {
        let manager = ConnectionManager::new(8);
        let (tx, _rx) = channel(8);
        let conn = manager.register(tx);

        assert!(manager.contains(&conn));
        assert_eq!(manager.room_of(&conn), None);

        manager.assign_to_room(&conn, "123456".to_string());
        assert_eq!(manager.room_of(&conn).as_deref(), Some("123456"));
        assert_eq!(manager.connections_in_room("123456"), vec![conn]);
        assert_eq!(manager.attached_room_count(), 1);

        manager.clear_room(&conn);
        assert_eq!(manager.room_of(&conn), None);
        assert!(manager.connections_in_room("123456").is_empty());
    }

    #[test]
    fn full_queue_marks_connection_lost() {
        let manager = ConnectionManager::new(1);
        let (tx, _rx) = channel(1);
        let conn = manager.register(tx);

        let frame = Arc::new(ServerFrame::Message(
            crate::protocol::ServerMessage::UserCountUpdate { count: 1 },
        ));
        assert!(manager.try_send(&conn, frame.clone()));
        // Queue capacity is 1 and nothing drains it.
        assert!(!manager.try_send(&conn, frame));
    }

    #[test]
    fn send_to_unknown_connection_fails() {
        let manager = ConnectionManager::new(4);
        let frame = Arc::new(ServerFrame::Message(
            crate::protocol::ServerMessage::UserCountUpdate { count: 0 },
        ));
        assert!(!manager.try_send(&Uuid::new_v4(), frame));
    }
}
