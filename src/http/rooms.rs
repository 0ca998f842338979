use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::ProfileId;
use crate::room::PlayerState;
use crate::server::LobbyServer;

use super::ApiResult;

/// `GET /api/rooms/active` — the same filtered, sorted listing the lobby
/// channel receives.
pub(super) async fn active_rooms(State(server): State<Arc<LobbyServer>>) -> Json<Value> {
    let rooms = server.joinable_rooms().await;
    Json(json!({ "rooms": rooms }))
}

/// `GET /api/rooms` — snapshots of every live room.
pub(super) async fn all_rooms(State(server): State<Arc<LobbyServer>>) -> Json<Value> {
    let rooms = server.all_room_views().await;
    Json(json!({ "rooms": rooms }))
}

/// `GET /api/rooms/{room_id}`
pub(super) async fn room_by_id(
    State(server): State<Arc<LobbyServer>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let view = server.room_view(&room_id).await?;
    Ok(Json(serde_json::to_value(view).unwrap_or(Value::Null)))
}

/// `GET /api/rooms/{room_id}/players`
pub(super) async fn room_players(
    State(server): State<Arc<LobbyServer>>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let view = server.room_view(&room_id).await?;
    Ok(Json(json!({ "roomId": view.room_id, "players": view.players })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateRoomBody {
    pub profile_id: ProfileId,
}

/// `POST /api/rooms/create` — a room shell owned by the given profile, with
/// no connection yet. The owner's socket joining later counts as a
/// reconnect and fills in the connection id.
pub(super) async fn create_room_shell(
    State(server): State<Arc<LobbyServer>>,
    Json(body): Json<CreateRoomBody>,
) -> ApiResult<Json<Value>> {
    let display = server.resolve_display(&body.profile_id).await?;
    let host = PlayerState::new(body.profile_id.clone(), None, &display);
    let (room_id, room) = server.registry().create(host);
    let summary = room.lock().await.summary();
    server
        .publish_lobby(
            &room_id,
            crate::protocol::RoomListAction::Created,
            Some(summary),
        )
        .await;
    tracing::info!(%room_id, profile_id = %body.profile_id, "Room shell created over HTTP");
    Ok(Json(json!({ "roomId": room_id, "hostProfileId": body.profile_id })))
}
