use crate::protocol::{
    ConnectionId, GameType, LobbyError, ProfileId, RoomId, RoomListAction, ServerMessage,
};
use crate::room::Room;

use super::LobbyServer;

impl LobbyServer {
    /// All authority is by profile id, never by socket. The host's
    /// connection id is only a delivery cache.
    pub(crate) fn require_host(
        room: &Room,
        profile_id: &str,
        action: &str,
    ) -> Result<(), LobbyError> {
        if room.is_host(profile_id) {
            Ok(())
        } else {
            Err(LobbyError::Unauthorized(format!(
                "Only the host can {action}"
            )))
        }
    }

    fn identified_profile(&self, connection_id: &ConnectionId) -> Result<ProfileId, LobbyError> {
        self.connections
            .profile_of(connection_id)
            .ok_or_else(|| LobbyError::Unauthorized("Not identified with a profile".to_string()))
    }

    /// `game-selected`: host picks (or re-picks) the game. Ready flags
    /// clear; a playing room returns to waiting for the next round.
    pub async fn handle_game_selected(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        game: GameType,
    ) -> Result<(), LobbyError> {
        let profile_id = self.identified_profile(&connection_id)?;
        let room = self.registry.get(&room_id)?;

        let (players, host_profile_id) = {
            let mut guard = room.lock().await;
            Self::require_host(&guard, &profile_id, "select the game")?;
            guard.select_game(game);
            (guard.player_snapshots(), guard.host_profile_id.clone())
        };

        tracing::info!(%room_id, game = %game, "Game selected");

        self.broadcast_message_to_room(
            &room_id,
            ServerMessage::GameSelected {
                game,
                players,
                host_profile_id,
            },
        );
        self.emit_room_snapshot(&room).await;
        Ok(())
    }

    /// `start-game`: host-only; needs a selected game, at least two
    /// members, and everyone ready.
    pub async fn handle_start_game(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), LobbyError> {
        let profile_id = self.identified_profile(&connection_id)?;
        let room = self.registry.get(&room_id)?;

        let (game, summary) = {
            let mut guard = room.lock().await;
            Self::require_host(&guard, &profile_id, "start the game")?;
            let game = guard.start_game()?;
            (game, guard.summary())
        };

        tracing::info!(%room_id, game = %game, "Game started");

        self.broadcast_message_to_room(&room_id, ServerMessage::GameStart { game });
        self.emit_room_snapshot(&room).await;
        self.publish_lobby(&room_id, RoomListAction::Updated, Some(summary))
            .await;
        Ok(())
    }

    /// `rotate-players`: winner-stays rotation between rounds.
    pub async fn handle_rotate_players(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        winner_profile_id: ProfileId,
        loser_profile_id: ProfileId,
    ) -> Result<(), LobbyError> {
        let profile_id = self.identified_profile(&connection_id)?;
        let room = self.registry.get(&room_id)?;

        let players = {
            let mut guard = room.lock().await;
            Self::require_host(&guard, &profile_id, "rotate players")?;
            guard.rotate(&winner_profile_id, &loser_profile_id)?;
            guard.player_snapshots()
        };

        self.broadcast_message_to_room(
            &room_id,
            ServerMessage::PlayersRotated {
                winner_profile_id,
                loser_profile_id,
                players,
            },
        );
        self.emit_room_snapshot(&room).await;
        Ok(())
    }
}
