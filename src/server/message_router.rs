use crate::protocol::{ClientFrame, ClientMessage, ConnectionId, ServerMessage};

use super::LobbyServer;

impl LobbyServer {
    /// Dispatch one inbound frame. Handler failures become a targeted
    /// `room-error` to the sender; nothing here can take the process down.
    pub async fn handle_client_frame(
        &self,
        connection_id: ConnectionId,
        frame: ClientFrame,
    ) {
        let result = match frame {
            ClientFrame::Message(message) => match message {
                ClientMessage::CreateRoom { profile_id, .. } => {
                    self.handle_create_room(connection_id, profile_id).await
                }
                ClientMessage::JoinRoom {
                    room_id, profile_id, ..
                } => self.handle_join_room(connection_id, room_id, profile_id).await,
                ClientMessage::LeaveRoom { room_id, profile_id } => {
                    self.handle_leave_room(connection_id, room_id, profile_id)
                        .await
                }
                ClientMessage::KickPlayer { room_id, profile_id } => {
                    self.handle_kick(connection_id, room_id, profile_id).await
                }
                ClientMessage::UpdatePlayerName { room_id, player_name } => {
                    self.handle_update_player_name(connection_id, room_id, player_name)
                        .await
                }
                ClientMessage::PlayerReady { room_id, ready } => {
                    self.handle_player_ready(connection_id, room_id, ready).await
                }
                ClientMessage::GameSelected { room_id, game } => {
                    self.handle_game_selected(connection_id, room_id, game).await
                }
                ClientMessage::StartGame { room_id } => {
                    self.handle_start_game(connection_id, room_id).await
                }
                ClientMessage::RotatePlayers {
                    room_id,
                    winner_profile_id,
                    loser_profile_id,
                } => {
                    self.handle_rotate_players(
                        connection_id,
                        room_id,
                        winner_profile_id,
                        loser_profile_id,
                    )
                    .await
                }
                ClientMessage::RequestRoomSnapshot { room_id } => {
                    self.handle_request_snapshot(connection_id, room_id).await
                }
                ClientMessage::RequestUserCount => {
                    self.send_message(
                        &connection_id,
                        ServerMessage::UserCountUpdate {
                            count: self.connections.count(),
                        },
                    );
                    Ok(())
                }
                ClientMessage::TestMessage(payload) => {
                    tracing::debug!(%connection_id, ?payload, "Test message");
                    self.send_message(&connection_id, ServerMessage::TestMessage(payload));
                    Ok(())
                }
            },
            ClientFrame::Game(event) => self.handle_game_event(connection_id, event).await,
        };

        if let Err(error) = result {
            tracing::debug!(%connection_id, %error, "Request failed");
            self.send_error(&connection_id, &error);
        }
    }
}
