use std::sync::Arc;

use crate::protocol::{ConnectionId, GameEvent, LobbyError, ServerFrame};

use super::LobbyServer;

impl LobbyServer {
    /// Relay one per-game event to the room channel, sender included, so
    /// every client sees the same deterministic echo. Validation:
    /// (1) the room exists, (2) the sender's profile is a member,
    /// (3) authoritative events come from the host. A failed check returns
    /// a targeted error and nothing is relayed.
    pub async fn handle_game_event(
        &self,
        connection_id: ConnectionId,
        event: GameEvent,
    ) -> Result<(), LobbyError> {
        let room_id = event.room_id().clone();
        let room = self.registry.get(&room_id)?;

        let profile_id = self
            .connections
            .profile_of(&connection_id)
            .ok_or_else(|| LobbyError::Unauthorized("Not identified with a profile".to_string()))?;

        {
            let mut guard = room.lock().await;
            if !guard.is_member(&profile_id) {
                return Err(LobbyError::Forbidden(format!(
                    "You are not a member of room {room_id}"
                )));
            }
            if event.is_authoritative() && !guard.is_host(&profile_id) {
                tracing::warn!(
                    %room_id,
                    profile_id = %profile_id,
                    event = event.name(),
                    "Dropping authoritative game event from non-host"
                );
                return Err(LobbyError::Unauthorized(format!(
                    "Only the host can send {}",
                    event.name()
                )));
            }
            guard.touch();
        }

        self.broadcast_to_room(&room_id, Arc::new(ServerFrame::Game(event)));
        Ok(())
    }
}
