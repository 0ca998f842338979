use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::LobbyServer;

use super::{admin, health, profiles, rooms};

/// The REST read/admin surface. `/api/rooms/active` and
/// `/api/user-profiles/active` are registered ahead of their `{id}`
/// captures so the literal segment is never mistaken for an id.
pub fn api_router() -> Router<Arc<LobbyServer>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/rooms/active", get(rooms::active_rooms))
        .route("/api/rooms/create", post(rooms::create_room_shell))
        .route("/api/rooms", get(rooms::all_rooms))
        .route("/api/rooms/{room_id}", get(rooms::room_by_id))
        .route("/api/rooms/{room_id}/players", get(rooms::room_players))
        .route("/api/admin/close-room/{room_id}", post(admin::close_room))
        .route("/api/admin/cleanup-stale", post(admin::cleanup_stale))
        .route("/api/admin/cleanup-room/{room_id}", post(admin::cleanup_room))
        .route(
            "/api/user-profiles/active",
            get(profiles::active_profiles),
        )
        .route("/api/user-profiles/search", post(profiles::search_profiles))
        .route(
            "/api/user-profiles",
            get(profiles::list_profiles).post(profiles::create_profile),
        )
        .route(
            "/api/user-profiles/{id}",
            get(profiles::profile_by_id)
                .post(profiles::update_profile)
                .delete(profiles::delete_profile),
        )
        .route(
            "/api/user-profiles/{id}/activate",
            post(profiles::activate_profile),
        )
        .route(
            "/api/user-profiles/{id}/deactivate",
            post(profiles::deactivate_profile),
        )
        .route("/api/wins/player/{id}", get(profiles::wins_by_player))
        .route(
            "/api/wins/room/{room_id}/{game_type}",
            get(profiles::wins_by_room),
        )
        .route("/api/wins/{game_type}", get(profiles::wins_by_game))
}
