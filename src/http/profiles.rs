use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::profile::NewProfile;
use crate::server::LobbyServer;

use super::ApiResult;

/// `GET /api/user-profiles`
pub(super) async fn list_profiles(
    State(server): State<Arc<LobbyServer>>,
) -> ApiResult<Json<Value>> {
    let profiles = server.profiles().get_all().await?;
    Ok(Json(json!({ "profiles": profiles })))
}

/// `GET /api/user-profiles/active` — profiles currently flagged active.
/// Routed before the `{id}` capture so "active" is never read as an id.
pub(super) async fn active_profiles(
    State(server): State<Arc<LobbyServer>>,
) -> ApiResult<Json<Value>> {
    let mut profiles = Vec::new();
    for profile_id in server.active_session_ids() {
        if let Some(record) = server.profiles().get_by_id(&profile_id).await? {
            profiles.push(record);
        }
    }
    Ok(Json(json!({ "profiles": profiles })))
}

/// `GET /api/user-profiles/{id}`
pub(super) async fn profile_by_id(
    State(server): State<Arc<LobbyServer>>,
    Path(profile_id): Path<String>,
) -> ApiResult<Json<Value>> {
    match server.profiles().get_by_id(&profile_id).await? {
        Some(record) => Ok(Json(serde_json::to_value(record).unwrap_or(Value::Null))),
        None => Err(crate::protocol::LobbyError::ProfileUnknown(profile_id).into()),
    }
}

/// `POST /api/user-profiles`
pub(super) async fn create_profile(
    State(server): State<Arc<LobbyServer>>,
    Json(body): Json<NewProfile>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let record = server.profiles().create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(record).unwrap_or(Value::Null)),
    ))
}

/// `POST /api/user-profiles/search` — forward search criteria.
pub(super) async fn search_profiles(
    State(server): State<Arc<LobbyServer>>,
    Json(criteria): Json<Value>,
) -> ApiResult<Json<Value>> {
    let profiles = server.profiles().search(criteria).await?;
    Ok(Json(json!({ "profiles": profiles })))
}

/// `POST /api/user-profiles/{id}` — forward a partial update.
pub(super) async fn update_profile(
    State(server): State<Arc<LobbyServer>>,
    Path(profile_id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Value>> {
    let record = server.profiles().update(&profile_id, patch).await?;
    Ok(Json(serde_json::to_value(record).unwrap_or(Value::Null)))
}

/// `DELETE /api/user-profiles/{id}`
pub(super) async fn delete_profile(
    State(server): State<Arc<LobbyServer>>,
    Path(profile_id): Path<String>,
) -> ApiResult<StatusCode> {
    server.profiles().delete(&profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/user-profiles/{id}/activate`
pub(super) async fn activate_profile(
    State(server): State<Arc<LobbyServer>>,
    Path(profile_id): Path<String>,
) -> Json<Value> {
    server.activate_session(profile_id.clone());
    Json(json!({ "profileId": profile_id, "active": true }))
}

/// `POST /api/user-profiles/{id}/deactivate`
pub(super) async fn deactivate_profile(
    State(server): State<Arc<LobbyServer>>,
    Path(profile_id): Path<String>,
) -> Json<Value> {
    let was_active = server.deactivate_session(&profile_id);
    Json(json!({ "profileId": profile_id, "active": false, "wasActive": was_active }))
}

/// `GET /api/wins/{game_type}`
pub(super) async fn wins_by_game(
    State(server): State<Arc<LobbyServer>>,
    Path(game_type): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(server.matches().wins_by_game(&game_type).await?))
}

/// `GET /api/wins/player/{id}`
pub(super) async fn wins_by_player(
    State(server): State<Arc<LobbyServer>>,
    Path(profile_id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(server.matches().wins_by_player(&profile_id).await?))
}

/// `GET /api/wins/room/{room_id}/{game_type}`
pub(super) async fn wins_by_room(
    State(server): State<Arc<LobbyServer>>,
    Path((room_id, game_type)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        server.matches().wins_by_room(&room_id, &game_type).await?,
    ))
}
