use chrono::Utc;

use crate::protocol::{CloseReason, LobbyError, ProfileId, RoomId, RoomSnapshotPayload};

use super::LobbyServer;

/// Room and socket counters surfaced by `/health`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub active_rooms: usize,
    pub active_players: usize,
    pub total_rooms: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketStats {
    pub total_connections: usize,
    pub active_rooms: usize,
}

impl LobbyServer {
    /// Force-close a room. With a requester profile the caller must be the
    /// host; without one this is an admin override.
    pub async fn admin_close_room(
        &self,
        room_id: &RoomId,
        requester: Option<ProfileId>,
    ) -> Result<(), LobbyError> {
        let room = self.registry.get(room_id)?;
        let message = if let Some(profile_id) = requester {
            let guard = room.lock().await;
            Self::require_host(&guard, &profile_id, "close the room")?;
            "Room closed by the host"
        } else {
            "Room closed by an administrator"
        };
        self.end_room(room_id, CloseReason::AdminClosed, message).await;
        Ok(())
    }

    /// Snapshot of one room for the read surface, without the profile
    /// refresh a broadcast does.
    pub async fn room_view(&self, room_id: &str) -> Result<RoomSnapshotPayload, LobbyError> {
        let room = self.registry.get(room_id)?;
        let guard = room.lock().await;
        Ok(guard.snapshot())
    }

    /// Snapshots of every live room.
    pub async fn all_room_views(&self) -> Vec<RoomSnapshotPayload> {
        let mut views = Vec::new();
        for (_, room) in self.registry.list() {
            let guard = room.lock().await;
            views.push(guard.snapshot());
        }
        views
    }

    pub async fn room_stats(&self) -> RoomStats {
        let mut active_players = 0;
        for (_, room) in self.registry.list() {
            active_players += room.lock().await.member_count();
        }
        RoomStats {
            active_rooms: self.registry.len(),
            active_players,
            total_rooms: self.registry.total_created(),
        }
    }

    pub fn socket_stats(&self) -> SocketStats {
        SocketStats {
            total_connections: self.connections.count(),
            active_rooms: self.connections.attached_room_count(),
        }
    }

    /// Membership-only "active sessions" set maintained by the
    /// activate/deactivate endpoints.
    pub fn activate_session(&self, profile_id: ProfileId) {
        self.active_sessions.insert(profile_id, Utc::now());
    }

    pub fn deactivate_session(&self, profile_id: &str) -> bool {
        self.active_sessions.remove(profile_id).is_some()
    }

    pub fn active_session_ids(&self) -> Vec<ProfileId> {
        self.active_sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
