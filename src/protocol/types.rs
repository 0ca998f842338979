use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity issued by the external profile store. Two profile ids are
/// the same player iff their canonical string forms are equal.
pub type ProfileId = String;

/// Ephemeral per-socket token. Reassigned on every reconnect, even for the
/// same profile.
pub type ConnectionId = Uuid;

/// Six-digit numeric room identifier, e.g. `"482913"`.
pub type RoomId = String;

/// Maximum members per room.
pub const MAX_PLAYERS: usize = 4;

/// Fallback appearance when the profile store has no value for a member.
pub const DEFAULT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_EMOJI: &str = "⚪";

/// Minimum members required before a game can start.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// The microgames the lobby can host. The server never simulates these; it
/// only relays their events with authority checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Pong,
    Snake,
    Memory,
    Magnet,
    Warioware,
}

impl GameType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pong => "pong",
            Self::Snake => "snake",
            Self::Memory => "memory",
            Self::Magnet => "magnet",
            Self::Warioware => "warioware",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room lifecycle state. Monotonic: a room never returns from `Ended`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Ended,
}

/// Display attributes for a player. `color` and `emoji` are always sourced
/// from the profile store when a snapshot is built; client-supplied values
/// are never substituted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDisplay {
    pub display_name: String,
    pub color: String,
    pub emoji: String,
}

impl Default for PlayerDisplay {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            color: DEFAULT_COLOR.to_string(),
            emoji: DEFAULT_EMOJI.to_string(),
        }
    }
}

/// One member as rendered into the canonical room snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub profile_id: ProfileId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    pub display_name: String,
    pub score: u32,
    pub ready: bool,
    pub color: String,
    pub emoji: String,
}

/// Canonical room state event payload. The single source of truth clients
/// reconcile against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshotPayload {
    pub room_id: RoomId,
    pub host_profile_id: ProfileId,
    pub status: RoomStatus,
    pub selected_game: Option<GameType>,
    pub players: Vec<PlayerSnapshot>,
}

/// One joinable room as rendered into the lobby listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub host_display_name: String,
    pub host_emoji: String,
    pub player_count: usize,
    pub max_players: usize,
    pub status: RoomStatus,
}

/// Why a member was removed from a room. `DisconnectWithGrace` is the host
/// drop that arms the reconnect window instead of clearing host identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Left,
    Disconnected,
    DisconnectWithGrace,
    Kicked,
    Stale,
    RoomClosed,
}

impl LeaveReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Disconnected => "disconnected",
            Self::DisconnectWithGrace => "disconnect_with_grace",
            Self::Kicked => "kicked",
            Self::Stale => "stale",
            Self::RoomClosed => "room_closed",
        }
    }
}

/// Why a room ended, carried on `room-closed` events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    HostTimeout,
    HostLeft,
    LastPlayerLeft,
    AdminClosed,
    Cleanup,
}

impl CloseReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HostTimeout => "host_timeout",
            Self::HostLeft => "host_left",
            Self::LastPlayerLeft => "last_player_left",
            Self::AdminClosed => "admin_closed",
            Self::Cleanup => "cleanup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_type_round_trips_lowercase() {
        let json = serde_json::to_string(&GameType::Pong).unwrap();
        assert_eq!(json, "\"pong\"");
        let parsed: GameType = serde_json::from_str("\"warioware\"").unwrap();
        assert_eq!(parsed, GameType::Warioware);
    }

    #[test]
    fn snapshot_fields_are_camel_case() {
        let snapshot = RoomSnapshotPayload {
            room_id: "123456".to_string(),
            host_profile_id: "p1".to_string(),
            status: RoomStatus::Waiting,
            selected_game: Some(GameType::Snake),
            players: vec![],
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("roomId").is_some());
        assert!(value.get("hostProfileId").is_some());
        assert_eq!(value["selectedGame"], "snake");
        assert_eq!(value["status"], "waiting");
    }

    #[test]
    fn absent_connection_id_is_omitted() {
        let player = PlayerSnapshot {
            profile_id: "p1".to_string(),
            connection_id: None,
            display_name: "Ada".to_string(),
            score: 0,
            ready: false,
            color: DEFAULT_COLOR.to_string(),
            emoji: DEFAULT_EMOJI.to_string(),
        };
        let value = serde_json::to_value(&player).unwrap();
        assert!(value.get("connectionId").is_none());
    }
}
