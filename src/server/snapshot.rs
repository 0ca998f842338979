use crate::protocol::{
    ConnectionId, RoomSnapshotPayload, ServerMessage, DEFAULT_COLOR, DEFAULT_EMOJI,
};
use crate::room::SharedRoom;

use super::LobbyServer;

impl LobbyServer {
    /// Build the canonical snapshot under the room lock, refreshing every
    /// member's `color`/`emoji` from the profile store first. The store is
    /// authoritative for appearance; a read that misses its deadline or
    /// fails degrades that member to defaults instead of stalling the room.
    pub(crate) async fn prepare_snapshot(&self, room: &SharedRoom) -> RoomSnapshotPayload {
        let mut guard = room.lock().await;

        let profile_ids: Vec<String> = guard
            .members()
            .iter()
            .map(|m| m.profile_id.clone())
            .collect();

        for profile_id in profile_ids {
            let read = tokio::time::timeout(
                self.profile_read_timeout(),
                self.profiles.get_by_id(&profile_id),
            )
            .await;

            let (color, emoji) = match read {
                Ok(Ok(Some(record))) => {
                    let display = record.display();
                    (display.color, display.emoji)
                }
                Ok(Ok(None)) => (DEFAULT_COLOR.to_string(), DEFAULT_EMOJI.to_string()),
                Ok(Err(err)) => {
                    tracing::warn!(%profile_id, error = %err, "Profile refresh failed; using defaults");
                    (DEFAULT_COLOR.to_string(), DEFAULT_EMOJI.to_string())
                }
                Err(_) => {
                    tracing::warn!(%profile_id, "Profile refresh timed out; using defaults");
                    (DEFAULT_COLOR.to_string(), DEFAULT_EMOJI.to_string())
                }
            };

            // Only appearance is store-owned here; name and score belong to
            // the room.
            if let Some(member) = guard.member_mut(&profile_id) {
                member.color = color;
                member.emoji = emoji;
            }
        }

        guard.snapshot()
    }

    /// Prepare and fan out the canonical snapshot to every connection on
    /// the room channel, the mutation originator included. Fan-out happens
    /// after the lock is released, over the copied payload.
    pub(crate) async fn emit_room_snapshot(&self, room: &SharedRoom) {
        let payload = self.prepare_snapshot(room).await;
        let room_id = payload.room_id.clone();
        self.broadcast_message_to_room(&room_id, ServerMessage::RoomSnapshot(Box::new(payload)));
    }

    /// Snapshot for one requester only (`request-room-snapshot`).
    pub(crate) async fn send_room_snapshot(
        &self,
        connection_id: &ConnectionId,
        room: &SharedRoom,
    ) {
        let payload = self.prepare_snapshot(room).await;
        self.send_message(connection_id, ServerMessage::RoomSnapshot(Box::new(payload)));
    }
}
