use crate::protocol::{RoomListAction, RoomSummary, ServerMessage};

use super::LobbyServer;

impl LobbyServer {
    /// Rooms the lobby should offer: live, not full, and not a ghost from
    /// the recently-ended set. Sorted by player count, fullest first.
    pub async fn joinable_rooms(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for (room_id, room) in self.registry.list() {
            if self.registry.was_recently_ended(&room_id) {
                continue;
            }
            let guard = room.lock().await;
            if guard.is_joinable() {
                summaries.push(guard.summary());
            }
        }
        summaries.sort_by(|a, b| b.player_count.cmp(&a.player_count));
        summaries
    }

    /// Push the lobby listing to every connection. Room occupants get it
    /// too: they need to see their own room disappear when it closes.
    pub(crate) async fn publish_lobby(
        &self,
        room_id: &str,
        action: RoomListAction,
        room: Option<RoomSummary>,
    ) {
        self.broadcast_all(ServerMessage::RoomListUpdated {
            room_id: room_id.to_string(),
            action,
            room,
        });
        let rooms = self.joinable_rooms().await;
        self.broadcast_all(ServerMessage::RoomList { rooms });
    }
}
