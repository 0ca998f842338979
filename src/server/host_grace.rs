use tokio_util::sync::CancellationToken;

use crate::protocol::{CloseReason, ProfileId, RoomId, RoomListAction, ServerMessage};

use super::LobbyServer;

impl LobbyServer {
    /// Host socket lost: partial removal. The membership record goes, the
    /// host identity stays, and a grace timer starts. The room remains
    /// listable in its current status; one reconnect by the same profile
    /// within the window restores authority.
    pub(crate) async fn begin_host_grace(&self, room_id: &RoomId, host: &ProfileId) {
        let Ok(room) = self.registry.get(room_id) else {
            return;
        };

        let token = CancellationToken::new();
        let summary = {
            let mut guard = room.lock().await;
            match guard.remove(host, crate::protocol::LeaveReason::DisconnectWithGrace) {
                Ok(removal) if removal.room_ended => {
                    // Host was the last member; nothing to wait for.
                    drop(guard);
                    self.end_room(room_id, CloseReason::LastPlayerLeft, "The room is empty")
                        .await;
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%room_id, error = %err, "Host grace removal failed");
                    return;
                }
            }
            guard.arm_host_grace(token.clone());
            guard.summary()
        };

        let window = self.host_grace_window();
        tracing::info!(%room_id, host = %host, window_secs = window.as_secs(), "Host disconnected; grace armed");

        self.broadcast_message_to_room(
            room_id,
            ServerMessage::HostDisconnected {
                message: "The host has disconnected. Waiting for them to return...".to_string(),
                reconnect_timeout: window.as_secs(),
            },
        );
        self.emit_room_snapshot(&room).await;
        self.publish_lobby(room_id, RoomListAction::Updated, Some(summary))
            .await;

        let Some(server) = self.arc() else {
            return;
        };
        let room_id = room_id.clone();
        let host = host.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::debug!(%room_id, host = %host, "Host grace timer disarmed");
                }
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    server.expire_host_grace(&room_id, &host).await;
                }
            }
        });
    }

    /// Grace window elapsed without the host returning: end the room.
    async fn expire_host_grace(&self, room_id: &RoomId, host: &ProfileId) {
        let Ok(room) = self.registry.get(room_id) else {
            return;
        };
        {
            let mut guard = room.lock().await;
            // The timer raced a reconnect or a close; the armed flag is the
            // source of truth.
            if !guard.host_grace_armed() || guard.is_member(host) {
                return;
            }
            guard.disarm_host_grace();
        }

        tracing::info!(%room_id, host = %host, "Host grace expired; ending room");
        self.end_room(
            room_id,
            CloseReason::HostTimeout,
            "The host did not return in time",
        )
        .await;
    }
}
