use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arcade_lobby_server::config::ServerTuning;
use arcade_lobby_server::http;
use arcade_lobby_server::profile::{InMemoryProfileStore, ProfileRecord};
use arcade_lobby_server::server::LobbyServer;
use arcade_lobby_server::websocket;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Spawn a full server (WebSocket + REST) on an ephemeral port, backed by
/// an in-memory profile store seeded with test profiles.
#[allow(dead_code)]
pub async fn spawn_test_server() -> (SocketAddr, Arc<LobbyServer>) {
    spawn_test_server_with_tuning(test_tuning()).await
}

#[allow(dead_code)]
pub async fn spawn_test_server_with_tuning(
    tuning: ServerTuning,
) -> (SocketAddr, Arc<LobbyServer>) {
    let store = Arc::new(InMemoryProfileStore::new());
    for (id, name, color, emoji) in [
        ("p1", "Ada", "#FF0000", "🦀"),
        ("p2", "Bo", "#00FF00", "🐍"),
        ("p3", "Cy", "#0000FF", "🧲"),
    ] {
        store.seed(ProfileRecord {
            id: id.to_string(),
            name: name.to_string(),
            color: Some(color.to_string()),
            emoji: Some(emoji.to_string()),
        });
    }
    let server = LobbyServer::with_stores(tuning, store.clone(), store);

    let app = Router::new()
        .merge(websocket::ws_router())
        .merge(http::api_router())
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server failed: {e}");
        }
    });

    (addr, server)
}

/// Tuning with fast cleanup cadences for tests.
#[allow(dead_code)]
pub fn test_tuning() -> ServerTuning {
    ServerTuning {
        empty_room_sweep_secs: 1,
        stale_sweep_secs: 1,
        recently_ended_ttl_secs: 1,
        ..ServerTuning::default()
    }
}

/// One test-side WebSocket participant.
#[allow(dead_code)]
pub struct WsClient {
    write: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    read: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

#[allow(dead_code)]
impl WsClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{addr}/ws");
        let (stream, _) = timeout(Duration::from_secs(5), connect_async(&url))
            .await
            .expect("connect timed out")
            .expect("connect failed");
        let (write, read) = stream.split();
        Self { write, read }
    }

    pub async fn send(&mut self, event: serde_json::Value) {
        self.write
            .send(Message::Text(event.to_string().into()))
            .await
            .expect("send failed");
    }

    pub async fn next_json(&mut self) -> serde_json::Value {
        loop {
            let message = timeout(Duration::from_secs(5), self.read.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).expect("invalid JSON frame");
            }
        }
    }

    /// Skip frames until one of the given event type arrives; returns its
    /// `data` payload.
    pub async fn wait_for(&mut self, event_type: &str) -> serde_json::Value {
        loop {
            let frame = self.next_json().await;
            if frame["type"] == event_type {
                return frame.get("data").cloned().unwrap_or(serde_json::Value::Null);
            }
        }
    }
}
