use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::ProfileId;
use crate::server::LobbyServer;

use super::ApiResult;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(super) struct CloseRoomBody {
    pub user_profile_id: Option<ProfileId>,
}

/// `POST /api/admin/close-room/{room_id}`. With a `userProfileId` the
/// caller must be the room's host; without one this is an admin override.
pub(super) async fn close_room(
    State(server): State<Arc<LobbyServer>>,
    Path(room_id): Path<String>,
    body: Option<Json<CloseRoomBody>>,
) -> ApiResult<Json<Value>> {
    let requester = body.and_then(|Json(b)| b.user_profile_id);
    server.admin_close_room(&room_id, requester).await?;
    Ok(Json(json!({ "roomId": room_id, "closed": true })))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(super) struct CleanupBody {
    #[serde(default)]
    pub force: bool,
    pub room_id: Option<String>,
}

/// `POST /api/admin/cleanup-stale` — run the janitor's stale sweep on
/// demand.
pub(super) async fn cleanup_stale(
    State(server): State<Arc<LobbyServer>>,
    body: Option<Json<CleanupBody>>,
) -> Json<Value> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let removed = server.cleanup_stale(body.force, body.room_id).await;
    Json(json!({ "removed": removed }))
}

/// `POST /api/admin/cleanup-room/{room_id}` — the same sweep, scoped.
pub(super) async fn cleanup_room(
    State(server): State<Arc<LobbyServer>>,
    Path(room_id): Path<String>,
    body: Option<Json<CleanupBody>>,
) -> Json<Value> {
    let force = body.map(|Json(b)| b.force).unwrap_or(false);
    let removed = server.cleanup_stale(force, Some(room_id.clone())).await;
    Json(json!({ "roomId": room_id, "removed": removed }))
}
