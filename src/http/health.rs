use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::server::LobbyServer;

/// `GET /health`
pub(super) async fn health(State(server): State<Arc<LobbyServer>>) -> Json<Value> {
    let uptime = server.uptime();
    let rooms = server.room_stats().await;
    let sockets = server.socket_stats();

    Json(json!({
        "status": "ok",
        "uptime": uptime_breakdown(uptime),
        "rooms": rooms,
        "sockets": sockets,
        "render": {
            "service": std::env::var("RENDER_SERVICE_NAME").ok(),
            "instance": std::env::var("RENDER_INSTANCE_ID").ok(),
            "gitCommit": std::env::var("RENDER_GIT_COMMIT").ok(),
        },
        "environment": {
            "version": env!("CARGO_PKG_VERSION"),
            "profileBackend": if std::env::var("NOCODE_BACKEND_URL").is_ok() { "remote" } else { "in-memory" },
        },
    }))
}

fn uptime_breakdown(uptime: Duration) -> Value {
    let ms = uptime.as_millis() as u64;
    let total_secs = uptime.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    json!({
        "ms": ms,
        "s": total_secs,
        "m": total_secs / 60,
        "h": total_secs / 3_600,
        "d": days,
        "formatted": format!("{days}d {hours}h {minutes}m {seconds}s"),
    })
}
