//! Wire protocol definitions: identifier types, client/server events, the
//! per-game relay event set, room id generation, and the error taxonomy.

pub mod errors;
pub mod messages;
pub mod room_ids;
pub mod types;

pub use errors::LobbyError;
pub use messages::{
    ClientFrame, ClientMessage, GameEvent, GameEventPayload, PlayerJoinedPayload, RoomListAction,
    ServerFrame, ServerMessage,
};
pub use room_ids::{generate_room_id, is_valid_room_id};
pub use types::{
    CloseReason, ConnectionId, GameType, LeaveReason, PlayerDisplay, PlayerSnapshot, ProfileId,
    RoomId, RoomSnapshotPayload, RoomStatus, RoomSummary, DEFAULT_COLOR, DEFAULT_EMOJI,
    MAX_PLAYERS, MIN_PLAYERS_TO_START,
};
