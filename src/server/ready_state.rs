use crate::protocol::{ConnectionId, LobbyError, RoomId, ServerMessage};

use super::LobbyServer;

impl LobbyServer {
    /// `player-ready`. Readiness may be declared before a game is selected;
    /// the start preconditions still gate `start-game`.
    pub async fn handle_player_ready(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        ready: bool,
    ) -> Result<(), LobbyError> {
        let profile_id = self
            .connections
            .profile_of(&connection_id)
            .ok_or_else(|| LobbyError::Invalid("No profile associated with this connection".to_string()))?;

        let room = self.registry.get(&room_id)?;

        let (players, all_ready, host_profile_id) = {
            let mut guard = room.lock().await;
            guard.set_ready(&profile_id, ready)?;
            (
                guard.player_snapshots(),
                guard.all_ready(),
                guard.host_profile_id.clone(),
            )
        };

        tracing::debug!(%room_id, profile_id = %profile_id, ready, all_ready, "Ready state changed");

        self.broadcast_message_to_room(
            &room_id,
            ServerMessage::PlayersReadyUpdated {
                players,
                all_ready,
                host_profile_id,
            },
        );
        self.emit_room_snapshot(&room).await;
        Ok(())
    }
}
