use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::{ClientFrame, LobbyError, ServerFrame, ServerMessage};
use crate::server::LobbyServer;

/// One socket's lifetime: register, pump frames both ways, and route the
/// close into the disconnect path. A connection sits in the lobby channel
/// until its first successful join.
pub(super) async fn handle_socket(socket: WebSocket, server: Arc<LobbyServer>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) =
        mpsc::channel::<Arc<ServerFrame>>(server.connections().outbound_queue_size());
    let connection_id = server.connections().register(tx);

    // A fresh connection enters the lobby; seed it with the current state.
    let rooms = server.joinable_rooms().await;
    server.send_message(&connection_id, ServerMessage::RoomList { rooms });
    server.send_message(
        &connection_id,
        ServerMessage::UserCountUpdate {
            count: server.connections().count(),
        },
    );

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(frame.as_ref()) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%connection_id, error = %err, "Failed to encode outbound frame");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let receive_server = server.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    tracing::debug!(%connection_id, error = %err, "WebSocket error");
                    break;
                }
            };
            match message {
                Message::Text(text) => {
                    match serde_json::from_str::<ClientFrame>(text.as_str()) {
                        Ok(frame) => {
                            receive_server
                                .handle_client_frame(connection_id, frame)
                                .await;
                        }
                        Err(err) => {
                            tracing::debug!(%connection_id, error = %err, "Malformed client frame");
                            receive_server.send_error(
                                &connection_id,
                                &LobbyError::Invalid("Malformed event payload".to_string()),
                            );
                        }
                    }
                }
                Message::Close(_) => {
                    tracing::info!(%connection_id, "WebSocket closed by client");
                    break;
                }
                // Pings are answered by the protocol layer; binary frames
                // are not part of this protocol.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::debug!(%connection_id, "Ignoring binary frame");
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    server.handle_disconnect(connection_id).await;
}
