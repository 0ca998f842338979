use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
    GameType, PlayerSnapshot, ProfileId, RoomId, RoomSnapshotPayload, RoomSummary,
};

/// Requests sent from client to server. Event names are the kebab-case
/// variant names; payload fields travel camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Create a room and become its host. Appearance fields are accepted for
    /// wire compatibility but ignored; the profile store wins.
    CreateRoom {
        profile_id: ProfileId,
        #[serde(skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color_id: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
    },
    /// Join an existing room. Same appearance treatment as `CreateRoom`.
    JoinRoom {
        room_id: RoomId,
        profile_id: ProfileId,
        #[serde(skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color_id: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
    },
    /// Leave the current room.
    LeaveRoom {
        room_id: RoomId,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile_id: Option<ProfileId>,
    },
    /// Remove another member from the room (host only).
    KickPlayer { room_id: RoomId, profile_id: ProfileId },
    /// Change the sender's display name inside the room.
    UpdatePlayerName { room_id: RoomId, player_name: String },
    /// Declare readiness for the currently selected game.
    PlayerReady { room_id: RoomId, ready: bool },
    /// Pick the game to play next (host only).
    GameSelected { room_id: RoomId, game: GameType },
    /// Start the selected game (host only; everyone must be ready).
    StartGame { room_id: RoomId },
    /// Winner-stays rotation between rounds (host only).
    RotatePlayers {
        room_id: RoomId,
        winner_profile_id: ProfileId,
        loser_profile_id: ProfileId,
    },
    /// Ask for the canonical snapshot, sent back to the requester only.
    RequestRoomSnapshot { room_id: RoomId },
    /// Ask for the live connection count.
    RequestUserCount,
    /// Diagnostic echo.
    TestMessage(Value),
}

/// Lobby-list change kinds carried on `room-list-updated`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomListAction {
    Created,
    Updated,
    Deleted,
}

/// Payload for the `player-joined` room-channel event.
/// Boxed in `ServerMessage` to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedPayload {
    pub room_id: RoomId,
    pub players: Vec<PlayerSnapshot>,
    /// Reserved for relayed game payloads; the core itself persists nothing.
    pub game_state: Option<Value>,
    pub is_host: bool,
    pub host_profile_id: ProfileId,
    pub selected_game: Option<GameType>,
}

/// Events sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// To the creator only.
    RoomCreated {
        room_id: RoomId,
        players: Vec<PlayerSnapshot>,
        host_profile_id: ProfileId,
    },
    /// Canonical room state, to the room channel.
    RoomSnapshot(Box<RoomSnapshotPayload>),
    /// To the room channel after a successful admit.
    PlayerJoined(Box<PlayerJoinedPayload>),
    /// To the room channel after a removal.
    PlayerLeft {
        profile_id: ProfileId,
        players: Vec<PlayerSnapshot>,
        room_id: RoomId,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    PlayersReadyUpdated {
        players: Vec<PlayerSnapshot>,
        all_ready: bool,
        host_profile_id: ProfileId,
    },
    GameSelected {
        game: GameType,
        players: Vec<PlayerSnapshot>,
        host_profile_id: ProfileId,
    },
    GameStart { game: GameType },
    PlayersRotated {
        winner_profile_id: ProfileId,
        loser_profile_id: ProfileId,
        players: Vec<PlayerSnapshot>,
    },
    /// To the kicked connection only.
    PlayerKicked { room_id: RoomId, message: String },
    /// To the room channel when the room ends.
    RoomClosed { reason: String, message: String },
    /// To every connection so lobby clients drop stale listings.
    RoomClosedBroadcast { room_id: RoomId, reason: String },
    HostDisconnected {
        message: String,
        /// Seconds the host has to return.
        reconnect_timeout: u64,
    },
    HostReconnected { message: String },
    RoomList { rooms: Vec<RoomSummary> },
    RoomListUpdated {
        room_id: RoomId,
        action: RoomListAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<RoomSummary>,
    },
    /// Targeted failure report; never broadcast.
    RoomError { message: String },
    UserCountUpdate { count: usize },
    /// Diagnostic echo back to the sender.
    TestMessage(Value),
}

/// Per-game relay payload: the room the event addresses plus whatever the
/// game shipped. The server validates the sender and re-emits the payload
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEventPayload {
    pub room_id: RoomId,
    #[serde(flatten)]
    pub body: serde_json::Map<String, Value>,
}

/// Typed per-game events, relayed between clients with identical names in
/// both directions. Participant events may come from any member;
/// authoritative events only from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum GameEvent {
    // Participant events: any member may send.
    PaddleMove(GameEventPayload),
    DirectionChange(GameEventPayload),
    CardFlip(GameEventPayload),
    PoleFlip(GameEventPayload),
    PlayerMove(GameEventPayload),
    // Authoritative events: host only.
    GameState(GameEventPayload),
    GameStateUpdate(GameEventPayload),
    PongGameState(GameEventPayload),
    SnakeGameState(GameEventPayload),
    MemoryGameState(GameEventPayload),
    MagnetGameState(GameEventPayload),
    MicrogameStart(GameEventPayload),
    MicrogamePlaying(GameEventPayload),
    MicrogameEnd(GameEventPayload),
}

impl GameEvent {
    pub fn payload(&self) -> &GameEventPayload {
        match self {
            Self::PaddleMove(p)
            | Self::DirectionChange(p)
            | Self::CardFlip(p)
            | Self::PoleFlip(p)
            | Self::PlayerMove(p)
            | Self::GameState(p)
            | Self::GameStateUpdate(p)
            | Self::PongGameState(p)
            | Self::SnakeGameState(p)
            | Self::MemoryGameState(p)
            | Self::MagnetGameState(p)
            | Self::MicrogameStart(p)
            | Self::MicrogamePlaying(p)
            | Self::MicrogameEnd(p) => p,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.payload().room_id
    }

    /// Whether only the room host may broadcast this event.
    pub fn is_authoritative(&self) -> bool {
        matches!(
            self,
            Self::GameState(_)
                | Self::GameStateUpdate(_)
                | Self::PongGameState(_)
                | Self::SnakeGameState(_)
                | Self::MemoryGameState(_)
                | Self::MagnetGameState(_)
                | Self::MicrogameStart(_)
                | Self::MicrogamePlaying(_)
                | Self::MicrogameEnd(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PaddleMove(_) => "paddle-move",
            Self::DirectionChange(_) => "direction-change",
            Self::CardFlip(_) => "card-flip",
            Self::PoleFlip(_) => "pole-flip",
            Self::PlayerMove(_) => "player-move",
            Self::GameState(_) => "game-state",
            Self::GameStateUpdate(_) => "game-state-update",
            Self::PongGameState(_) => "pong-game-state",
            Self::SnakeGameState(_) => "snake-game-state",
            Self::MemoryGameState(_) => "memory-game-state",
            Self::MagnetGameState(_) => "magnet-game-state",
            Self::MicrogameStart(_) => "microgame-start",
            Self::MicrogamePlaying(_) => "microgame-playing",
            Self::MicrogameEnd(_) => "microgame-end",
        }
    }
}

/// One inbound wire frame: either a lobby request or a game relay event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClientFrame {
    Message(ClientMessage),
    Game(GameEvent),
}

/// One outbound wire frame.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Message(ServerMessage),
    Game(GameEvent),
}

impl From<ServerMessage> for ServerFrame {
    fn from(message: ServerMessage) -> Self {
        Self::Message(message)
    }
}

impl From<GameEvent> for ServerFrame {
    fn from(event: GameEvent) -> Self {
        Self::Game(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_parses_and_ignores_appearance() {
        let raw = r#"{"type":"create-room","data":{"profileId":"p1","playerName":"Ada","colorId":3,"emoji":"🔥"}}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        match frame {
            ClientFrame::Message(ClientMessage::CreateRoom {
                profile_id,
                player_name,
                ..
            }) => {
                assert_eq!(profile_id, "p1");
                assert_eq!(player_name.as_deref(), Some("Ada"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn game_event_round_trips_with_identical_name() {
        let raw = r#"{"type":"paddle-move","data":{"roomId":"123456","y":0.42}}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        let ClientFrame::Game(event) = frame else {
            panic!("expected game event");
        };
        assert_eq!(event.room_id(), "123456");
        assert!(!event.is_authoritative());

        let echoed = serde_json::to_value(ServerFrame::from(event)).unwrap();
        assert_eq!(echoed["type"], "paddle-move");
        assert_eq!(echoed["data"]["roomId"], "123456");
        assert_eq!(echoed["data"]["y"], 0.42);
    }

    #[test]
    fn authoritative_classification() {
        let raw = r#"{"type":"pong-game-state","data":{"roomId":"123456","ball":{"x":1}}}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        let ClientFrame::Game(event) = frame else {
            panic!("expected game event");
        };
        assert!(event.is_authoritative());
        assert_eq!(event.name(), "pong-game-state");
    }

    #[test]
    fn server_events_use_kebab_names() {
        let message = ServerMessage::UserCountUpdate { count: 7 };
        let value = serde_json::to_value(ServerFrame::from(message)).unwrap();
        assert_eq!(value["type"], "user-count-update");
        assert_eq!(value["data"]["count"], 7);
    }

    #[test]
    fn room_error_is_targeted_shape() {
        let message = ServerMessage::RoomError {
            message: "Only the host can start the game".to_string(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "room-error");
        assert_eq!(value["data"]["message"], "Only the host can start the game");
    }

    #[test]
    fn unit_request_parses_without_data() {
        let raw = r#"{"type":"request-user-count"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            frame,
            ClientFrame::Message(ClientMessage::RequestUserCount)
        ));
    }
}
