use crate::protocol::{
    is_valid_room_id, CloseReason, ConnectionId, LeaveReason, LobbyError, PlayerDisplay,
    PlayerJoinedPayload, ProfileId, RoomId, RoomListAction, RoomStatus, ServerMessage,
};
use crate::room::{AdmitOutcome, PlayerState};

use super::LobbyServer;

impl LobbyServer {
    /// Resolve a profile id through the store. The store is the only
    /// accepted source for display attributes; there is no client
    /// fallback.
    pub(crate) async fn resolve_display(
        &self,
        profile_id: &str,
    ) -> Result<PlayerDisplay, LobbyError> {
        let read = tokio::time::timeout(
            self.profile_read_timeout(),
            self.profiles.get_by_id(profile_id),
        )
        .await;
        match read {
            Ok(Ok(Some(record))) => Ok(record.display()),
            Ok(Ok(None)) => Err(LobbyError::ProfileUnknown(profile_id.to_string())),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(LobbyError::Upstream("profile read timed out".to_string())),
        }
    }

    /// `create-room`: the creator becomes host and first member.
    pub async fn handle_create_room(
        &self,
        connection_id: ConnectionId,
        profile_id: ProfileId,
    ) -> Result<(), LobbyError> {
        let display = self.resolve_display(&profile_id).await?;

        self.leave_current_room(connection_id).await;

        let host = PlayerState::new(profile_id.clone(), Some(connection_id), &display);
        let (room_id, room) = self.registry.create(host);

        self.connections.set_profile(&connection_id, profile_id.clone());
        self.connections.assign_to_room(&connection_id, room_id.clone());

        let (players, summary) = {
            let guard = room.lock().await;
            (guard.player_snapshots(), guard.summary())
        };

        tracing::info!(%connection_id, %room_id, profile_id = %profile_id, "Room created");

        self.send_message(
            &connection_id,
            ServerMessage::RoomCreated {
                room_id: room_id.clone(),
                players,
                host_profile_id: profile_id,
            },
        );
        self.emit_room_snapshot(&room).await;
        self.publish_lobby(&room_id, RoomListAction::Created, Some(summary))
            .await;
        Ok(())
    }

    /// `join-room`: admit a new member, or treat a duplicate profile as a
    /// reconnect.
    pub async fn handle_join_room(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        profile_id: ProfileId,
    ) -> Result<(), LobbyError> {
        if !is_valid_room_id(&room_id) {
            return Err(LobbyError::Invalid(format!(
                "'{room_id}' is not a valid room id"
            )));
        }

        let display = self.resolve_display(&profile_id).await?;
        let room = self.registry.get(&room_id)?;

        if self
            .connections
            .room_of(&connection_id)
            .is_some_and(|current| current != room_id)
        {
            self.leave_current_room(connection_id).await;
        }

        let (outcome, summary, player_count) = {
            let mut guard = room.lock().await;
            if guard.status == RoomStatus::Ended {
                return Err(LobbyError::RoomNotFound(room_id));
            }
            let outcome = guard.admit(profile_id.clone(), connection_id, &display)?;
            (outcome, guard.summary(), guard.member_count())
        };

        self.connections.set_profile(&connection_id, profile_id.clone());
        self.connections.assign_to_room(&connection_id, room_id.clone());
        self.reap_room_stragglers(&room_id).await;

        tracing::info!(
            %connection_id,
            %room_id,
            profile_id = %profile_id,
            ?outcome,
            player_count,
            "Player admitted"
        );

        if outcome.host_restored() {
            self.broadcast_message_to_room(
                &room_id,
                ServerMessage::HostReconnected {
                    message: "The host has reconnected".to_string(),
                },
            );
        }
        if matches!(outcome, AdmitOutcome::Joined { .. }) {
            let payload = {
                let guard = room.lock().await;
                PlayerJoinedPayload {
                    room_id: room_id.clone(),
                    players: guard.player_snapshots(),
                    game_state: None,
                    is_host: guard.is_host(&profile_id),
                    host_profile_id: guard.host_profile_id.clone(),
                    selected_game: guard.selected_game,
                }
            };
            self.broadcast_message_to_room(
                &room_id,
                ServerMessage::PlayerJoined(Box::new(payload)),
            );
        }

        self.emit_room_snapshot(&room).await;
        self.publish_lobby(&room_id, RoomListAction::Updated, Some(summary))
            .await;
        Ok(())
    }

    /// `leave-room`. An explicit leave by the host ends the room: a live
    /// room always has its host as a member or a grace timer armed, and
    /// grace is reserved for connection loss, not intent.
    pub async fn handle_leave_room(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        profile_id: Option<ProfileId>,
    ) -> Result<(), LobbyError> {
        let profile_id = profile_id
            .or_else(|| self.connections.profile_of(&connection_id))
            .ok_or_else(|| LobbyError::Invalid("No profile associated with this connection".to_string()))?;

        let room = self.registry.get(&room_id)?;

        let is_host = {
            let guard = room.lock().await;
            if !guard.is_member(&profile_id) {
                return Err(LobbyError::Invalid(format!(
                    "{profile_id} is not a member of room {room_id}"
                )));
            }
            guard.is_host(&profile_id) && guard.member_count() > 1
        };

        if is_host {
            self.end_room(
                &room_id,
                CloseReason::HostLeft,
                "The host has left the room",
            )
            .await;
            return Ok(());
        }

        self.remove_member_standard(&room_id, &profile_id, LeaveReason::Left)
            .await
    }

    /// Standard removal path shared by explicit leaves, non-host
    /// disconnects, and the janitor's stale sweep. The departing
    /// connection's final delivery happens before its detachment, so its
    /// client reconciles to a state in which it is absent.
    pub(crate) async fn remove_member_standard(
        &self,
        room_id: &RoomId,
        profile_id: &str,
        reason: LeaveReason,
    ) -> Result<(), LobbyError> {
        let room = self.registry.get(room_id)?;

        let (removal, players, summary) = {
            let mut guard = room.lock().await;
            let removal = guard.remove(profile_id, reason)?;
            (removal, guard.player_snapshots(), guard.summary())
        };

        tracing::info!(%room_id, profile_id, reason = reason.as_str(), "Player removed");

        self.broadcast_message_to_room(
            room_id,
            ServerMessage::PlayerLeft {
                profile_id: profile_id.to_string(),
                players,
                room_id: room_id.clone(),
                reason: Some(reason.as_str().to_string()),
            },
        );
        self.emit_room_snapshot(&room).await;

        if let Some(leaver_connection) = removal.player.connection_id {
            self.connections.clear_room(&leaver_connection);
        }

        if removal.room_ended {
            self.end_room(room_id, CloseReason::LastPlayerLeft, "The room is empty")
                .await;
        } else {
            self.publish_lobby(room_id, RoomListAction::Updated, Some(summary))
                .await;
        }
        Ok(())
    }

    /// Socket loss. Host drops arm the reconnect grace window instead of
    /// ending the room; everyone else goes through the standard removal
    /// path.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let room_id = self.connections.room_of(&connection_id);
        let profile_id = self.connections.profile_of(&connection_id);
        self.connections.remove(&connection_id);

        let (Some(room_id), Some(profile_id)) = (room_id, profile_id) else {
            tracing::debug!(%connection_id, "Lobby connection closed");
            return;
        };

        let Ok(room) = self.registry.get(&room_id) else {
            return;
        };

        enum DisconnectPlan {
            None,
            HostGrace,
            StandardRemove,
        }

        let plan = {
            let guard = room.lock().await;
            match guard.member(&profile_id) {
                // A newer socket already took over this membership; the
                // stale disconnect must not undo the reconnect.
                Some(member) if member.connection_id != Some(connection_id) => {
                    DisconnectPlan::None
                }
                Some(_) if guard.is_host(&profile_id) && guard.member_count() > 1 => {
                    DisconnectPlan::HostGrace
                }
                Some(_) => DisconnectPlan::StandardRemove,
                None => DisconnectPlan::None,
            }
        };

        match plan {
            DisconnectPlan::None => {}
            DisconnectPlan::HostGrace => {
                self.begin_host_grace(&room_id, &profile_id).await;
            }
            DisconnectPlan::StandardRemove => {
                if let Err(err) = self
                    .remove_member_standard(&room_id, &profile_id, LeaveReason::Disconnected)
                    .await
                {
                    tracing::warn!(%room_id, profile_id = %profile_id, error = %err, "Disconnect removal failed");
                }
            }
        }
    }

    /// `kick-player`: host-only, never self. The target gets a directed
    /// notice and nothing else for that room.
    pub async fn handle_kick(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        target_profile_id: ProfileId,
    ) -> Result<(), LobbyError> {
        let requester = self
            .connections
            .profile_of(&connection_id)
            .ok_or_else(|| LobbyError::Unauthorized("Not identified with a profile".to_string()))?;

        let room = self.registry.get(&room_id)?;

        let (removal, players, summary) = {
            let mut guard = room.lock().await;
            Self::require_host(&guard, &requester, "kick players")?;
            if target_profile_id == requester {
                return Err(LobbyError::Forbidden("You cannot kick yourself".to_string()));
            }
            let removal = guard.remove(&target_profile_id, LeaveReason::Kicked)?;
            (removal, guard.player_snapshots(), guard.summary())
        };

        tracing::info!(%room_id, target = %target_profile_id, by = %requester, "Player kicked");

        // Directed notice first, then detach, so the target never sees the
        // post-kick snapshot.
        if let Some(target_connection) = removal.player.connection_id {
            self.send_message(
                &target_connection,
                ServerMessage::PlayerKicked {
                    room_id: room_id.clone(),
                    message: "You were removed from the room by the host".to_string(),
                },
            );
            self.connections.clear_room(&target_connection);
        }

        self.broadcast_message_to_room(
            &room_id,
            ServerMessage::PlayerLeft {
                profile_id: target_profile_id,
                players,
                room_id: room_id.clone(),
                reason: Some(LeaveReason::Kicked.as_str().to_string()),
            },
        );
        self.emit_room_snapshot(&room).await;

        if removal.room_ended {
            self.end_room(&room_id, CloseReason::LastPlayerLeft, "The room is empty")
                .await;
        } else {
            self.publish_lobby(&room_id, RoomListAction::Updated, Some(summary))
                .await;
        }
        Ok(())
    }

    /// `update-player-name`: renames inside the room only. Appearance stays
    /// store-owned.
    pub async fn handle_update_player_name(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        player_name: String,
    ) -> Result<(), LobbyError> {
        let trimmed = player_name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > 32 {
            return Err(LobbyError::Invalid(
                "Player name must be 1-32 characters".to_string(),
            ));
        }
        let profile_id = self
            .connections
            .profile_of(&connection_id)
            .ok_or_else(|| LobbyError::Invalid("No profile associated with this connection".to_string()))?;

        let room = self.registry.get(&room_id)?;
        {
            let mut guard = room.lock().await;
            let id = guard.id.clone();
            let member = guard.member_mut(&profile_id).ok_or_else(|| {
                LobbyError::Invalid(format!("{profile_id} is not a member of room {id}"))
            })?;
            member.display_name = trimmed.to_string();
            guard.touch();
        }

        self.emit_room_snapshot(&room).await;
        Ok(())
    }

    /// `request-room-snapshot`: canonical state to the requester only.
    pub async fn handle_request_snapshot(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), LobbyError> {
        let room = self.registry.get(&room_id)?;
        self.send_room_snapshot(&connection_id, &room).await;
        Ok(())
    }

    /// End a room: notify the channel, detach every connection back to the
    /// lobby, drop it from the registry, and tell the world. Idempotent.
    pub(crate) async fn end_room(
        &self,
        room_id: &RoomId,
        reason: CloseReason,
        message: &str,
    ) {
        let Ok(room) = self.registry.get(room_id) else {
            return;
        };

        {
            let mut guard = room.lock().await;
            guard.end();
        }

        tracing::info!(%room_id, reason = reason.as_str(), "Room ended");

        self.broadcast_message_to_room(
            room_id,
            ServerMessage::RoomClosed {
                reason: reason.as_str().to_string(),
                message: message.to_string(),
            },
        );

        for connection_id in self.connections.connections_in_room(room_id) {
            self.connections.clear_room(&connection_id);
        }

        self.registry.remove(room_id);

        self.broadcast_all(ServerMessage::RoomClosedBroadcast {
            room_id: room_id.clone(),
            reason: reason.as_str().to_string(),
        });
        self.publish_lobby(room_id, RoomListAction::Deleted, None).await;
    }

    /// Detach connections sitting on a room channel that no live member
    /// owns. Stragglers come from earlier join/leave races.
    pub(crate) async fn reap_room_stragglers(&self, room_id: &RoomId) {
        let Ok(room) = self.registry.get(room_id) else {
            return;
        };
        let member_connections: Vec<_> = {
            let guard = room.lock().await;
            guard
                .members()
                .iter()
                .filter_map(|m| m.connection_id)
                .collect()
        };
        for connection_id in self.connections.connections_in_room(room_id) {
            if !member_connections.contains(&connection_id) {
                tracing::debug!(%connection_id, %room_id, "Reaping straggler connection from room channel");
                self.connections.clear_room(&connection_id);
            }
        }
    }

    /// Remove this connection's membership in whatever room it currently
    /// occupies. Used when a socket create/joins while still attached
    /// elsewhere.
    async fn leave_current_room(&self, connection_id: ConnectionId) {
        let Some(room_id) = self.connections.room_of(&connection_id) else {
            return;
        };
        let Some(profile_id) = self.connections.profile_of(&connection_id) else {
            self.connections.clear_room(&connection_id);
            return;
        };
        if let Err(err) = self
            .handle_leave_room(connection_id, room_id.clone(), Some(profile_id))
            .await
        {
            tracing::debug!(%connection_id, %room_id, error = %err, "Implicit leave before join failed");
            self.connections.clear_room(&connection_id);
        }
    }
}
