use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::server::LobbyServer;

use super::connection::handle_socket;

/// The event-stream endpoint clients connect to.
pub fn ws_router() -> Router<Arc<LobbyServer>> {
    Router::new().route("/ws", get(websocket_handler))
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<LobbyServer>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}
