use std::sync::Arc;

use crate::protocol::{ConnectionId, LobbyError, ServerFrame, ServerMessage};

use super::LobbyServer;

impl LobbyServer {
    /// Send one frame to one connection. A failed enqueue routes the
    /// connection into the disconnect path.
    pub(crate) fn send_frame(&self, connection_id: &ConnectionId, frame: Arc<ServerFrame>) {
        if !self.connections.try_send(connection_id, frame) {
            self.reap_lost(vec![*connection_id]);
        }
    }

    pub(crate) fn send_message(
        &self,
        connection_id: &ConnectionId,
        message: ServerMessage,
    ) {
        self.send_frame(connection_id, Arc::new(ServerFrame::Message(message)));
    }

    /// Targeted failure report to the originating connection only.
    pub(crate) fn send_error(&self, connection_id: &ConnectionId, error: &LobbyError) {
        self.send_message(
            connection_id,
            ServerMessage::RoomError {
                message: error.to_string(),
            },
        );
    }

    /// Fan one frame out to every connection attached to a room's channel,
    /// including the originator of the triggering mutation. Callers must
    /// not hold the room lock.
    pub(crate) fn broadcast_to_room(&self, room_id: &str, frame: Arc<ServerFrame>) {
        let mut lost = Vec::new();
        for connection_id in self.connections.connections_in_room(room_id) {
            if !self.connections.try_send(&connection_id, frame.clone()) {
                lost.push(connection_id);
            }
        }
        self.reap_lost(lost);
    }

    pub(crate) fn broadcast_message_to_room(
        &self,
        room_id: &str,
        message: ServerMessage,
    ) {
        self.broadcast_to_room(room_id, Arc::new(ServerFrame::Message(message)));
    }

    /// Fan one frame out to every live connection, lobby and rooms alike.
    pub(crate) fn broadcast_all(&self, message: ServerMessage) {
        let frame = Arc::new(ServerFrame::Message(message));
        let mut lost = Vec::new();
        for connection_id in self.connections.all_connections() {
            if !self.connections.try_send(&connection_id, frame.clone()) {
                lost.push(connection_id);
            }
        }
        self.reap_lost(lost);
    }

    /// Route lost connections into the standard disconnect path. Spawned so
    /// a mid-broadcast loss never recurses into another fan-out on this
    /// stack.
    pub(crate) fn reap_lost(&self, lost: Vec<ConnectionId>) {
        if lost.is_empty() {
            return;
        }
        let Some(server) = self.arc() else {
            return;
        };
        for connection_id in lost {
            let server = server.clone();
            tokio::spawn(async move {
                server.handle_disconnect(connection_id).await;
            });
        }
    }
}
