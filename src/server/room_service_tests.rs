use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::ServerTuning;
use crate::profile::{InMemoryProfileStore, ProfileRecord};
use crate::protocol::{
    ClientFrame, ClientMessage, ConnectionId, GameType, RoomSnapshotPayload, RoomStatus,
    ServerFrame, ServerMessage,
};

use super::LobbyServer;

pub(crate) struct TestClient {
    pub connection_id: ConnectionId,
    pub rx: mpsc::Receiver<Arc<ServerFrame>>,
}

impl TestClient {
    /// Frames already enqueued by handlers that ran to completion.
    pub fn drain(&mut self) -> Vec<Arc<ServerFrame>> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub async fn recv(&mut self) -> Arc<ServerFrame> {
        tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("channel closed")
    }

    /// Wait until a frame matching the predicate arrives, discarding the
    /// rest.
    pub async fn wait_for<F, T>(&mut self, mut predicate: F) -> T
    where
        F: FnMut(&ServerFrame) -> Option<T>,
    {
        loop {
            let frame = self.recv().await;
            if let Some(found) = predicate(frame.as_ref()) {
                return found;
            }
        }
    }
}

pub(crate) fn seeded_server(tuning: ServerTuning) -> Arc<LobbyServer> {
    let store = Arc::new(InMemoryProfileStore::new());
    for (id, name, color, emoji) in [
        ("p1", "Ada", "#FF0000", "🦀"),
        ("p2", "Bo", "#00FF00", "🐍"),
        ("p3", "Cy", "#0000FF", "🧲"),
        ("p4", "Dee", "#FFFF00", "🏓"),
        ("p5", "Em", "#FF00FF", "🧠"),
    ] {
        store.seed(ProfileRecord {
            id: id.to_string(),
            name: name.to_string(),
            color: Some(color.to_string()),
            emoji: Some(emoji.to_string()),
        });
    }
    LobbyServer::with_stores(tuning, store.clone(), store)
}

pub(crate) fn connect(server: &Arc<LobbyServer>) -> TestClient {
    let (tx, rx) = mpsc::channel(256);
    let connection_id = server.connections.register(tx);
    TestClient { connection_id, rx }
}

pub(crate) fn as_snapshot(frame: &ServerFrame) -> Option<RoomSnapshotPayload> {
    match frame {
        ServerFrame::Message(ServerMessage::RoomSnapshot(payload)) => Some((**payload).clone()),
        _ => None,
    }
}

pub(crate) fn as_room_error(frame: &ServerFrame) -> Option<String> {
    match frame {
        ServerFrame::Message(ServerMessage::RoomError { message }) => Some(message.clone()),
        _ => None,
    }
}

async fn create_room(server: &Arc<LobbyServer>, client: &mut TestClient, profile: &str) -> String {
    server
        .handle_create_room(client.connection_id, profile.to_string())
        .await
        .expect("create should succeed");
    client
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::RoomCreated { room_id, .. }) => {
                Some(room_id.clone())
            }
            _ => None,
        })
        .await
}

#[tokio::test]
async fn create_join_ready_start_flow() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let mut guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    let snapshot = host.wait_for(as_snapshot).await;
    assert_eq!(snapshot.host_profile_id, "p1");
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].color, "#FF0000");

    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    let snapshot = guest.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players.len(), 2);
    assert!(!snapshot.players[1].ready);
    let snapshot = host.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players.len(), 2);

    server
        .handle_game_selected(host.connection_id, room_id.clone(), GameType::Pong)
        .await
        .unwrap();
    let selected = guest
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::GameSelected { game, .. }) => Some(*game),
            _ => None,
        })
        .await;
    assert_eq!(selected, GameType::Pong);
    let snapshot = guest.wait_for(as_snapshot).await;
    assert_eq!(snapshot.selected_game, Some(GameType::Pong));
    assert!(snapshot.players.iter().all(|p| !p.ready));

    server
        .handle_player_ready(host.connection_id, room_id.clone(), true)
        .await
        .unwrap();
    server
        .handle_player_ready(guest.connection_id, room_id.clone(), true)
        .await
        .unwrap();
    host.drain();
    guest.drain();

    server
        .handle_start_game(host.connection_id, room_id.clone())
        .await
        .unwrap();
    let started = guest
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::GameStart { game }) => Some(*game),
            _ => None,
        })
        .await;
    assert_eq!(started, GameType::Pong);
    let snapshot = guest.wait_for(as_snapshot).await;
    assert_eq!(snapshot.status, RoomStatus::Playing);
    assert!(snapshot.players.iter().all(|p| !p.ready));
}

#[tokio::test]
async fn non_host_start_is_a_targeted_error() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let mut guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    server
        .handle_game_selected(host.connection_id, room_id.clone(), GameType::Pong)
        .await
        .unwrap();
    host.drain();
    guest.drain();

    // Through the router so the error lands as a targeted room-error.
    server
        .handle_client_frame(
            guest.connection_id,
            ClientFrame::Message(ClientMessage::StartGame {
                room_id: room_id.clone(),
            }),
        )
        .await;

    let error = guest.wait_for(as_room_error).await;
    assert_eq!(error, "Only the host can start the game");

    // The host saw neither an error nor a state change.
    for frame in host.drain() {
        assert!(as_room_error(frame.as_ref()).is_none());
        assert!(!matches!(
            frame.as_ref(),
            ServerFrame::Message(ServerMessage::GameStart { .. })
        ));
    }
    let snapshot = server.room_view(&room_id).await.unwrap();
    assert_eq!(snapshot.status, RoomStatus::Waiting);
}

#[tokio::test]
async fn host_disconnect_arms_grace_and_reconnect_restores() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let mut guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    host.drain();
    guest.drain();

    server.handle_disconnect(host.connection_id).await;

    let timeout = guest
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::HostDisconnected {
                reconnect_timeout, ..
            }) => Some(*reconnect_timeout),
            _ => None,
        })
        .await;
    assert_eq!(timeout, 60);
    let snapshot = guest.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.host_profile_id, "p1", "host identity survives");
    assert!(server.registry.contains(&room_id), "room is still live");
    {
        let room = server.registry.get(&room_id).unwrap();
        assert!(room.lock().await.host_grace_armed());
    }

    // The host returns on a brand-new connection.
    let mut returned = connect(&server);
    server
        .handle_join_room(returned.connection_id, room_id.clone(), "p1".to_string())
        .await
        .unwrap();

    guest
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::HostReconnected { .. }) => Some(()),
            _ => None,
        })
        .await;
    let snapshot = guest.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.host_profile_id, "p1");
    {
        let room = server.registry.get(&room_id).unwrap();
        let guard = room.lock().await;
        assert!(!guard.host_grace_armed());
        assert_eq!(guard.host_connection_id, Some(returned.connection_id));
    }
    returned.drain();
}

#[tokio::test]
async fn host_grace_expiry_closes_the_room() {
    let tuning = ServerTuning {
        host_grace_secs: 0,
        ..ServerTuning::default()
    };
    let server = seeded_server(tuning);
    let mut host = connect(&server);
    let mut guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    guest.drain();

    server.handle_disconnect(host.connection_id).await;

    let reason = guest
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::RoomClosed { reason, .. }) => Some(reason.clone()),
            _ => None,
        })
        .await;
    assert_eq!(reason, "host_timeout");

    // Give the expiry task a beat to finish the registry removal.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!server.registry.contains(&room_id));
    assert!(server.registry.was_recently_ended(&room_id));
    assert!(server.joinable_rooms().await.is_empty());
}

#[tokio::test]
async fn kick_notifies_target_once_and_updates_the_rest() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let mut guest = connect(&server);
    let mut target = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    server
        .handle_join_room(target.connection_id, room_id.clone(), "p3".to_string())
        .await
        .unwrap();
    host.drain();
    guest.drain();
    target.drain();

    server
        .handle_kick(host.connection_id, room_id.clone(), "p3".to_string())
        .await
        .unwrap();

    let kicked_from = target
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::PlayerKicked { room_id, .. }) => {
                Some(room_id.clone())
            }
            _ => None,
        })
        .await;
    assert_eq!(kicked_from, room_id);
    // Nothing else addressed to that room reaches the target.
    for frame in target.drain() {
        if let Some(snapshot) = as_snapshot(frame.as_ref()) {
            panic!("kicked player received a room snapshot: {snapshot:?}");
        }
        assert!(!matches!(
            frame.as_ref(),
            ServerFrame::Message(ServerMessage::PlayerLeft { .. })
        ));
    }

    let snapshot = guest.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players.len(), 2);
    assert!(snapshot.players.iter().all(|p| p.profile_id != "p3"));
}

#[tokio::test]
async fn kick_of_non_member_changes_nothing() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    host.drain();

    let err = server
        .handle_kick(host.connection_id, room_id.clone(), "p4".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, crate::protocol::LobbyError::Invalid(_)));

    let snapshot = server.room_view(&room_id).await.unwrap();
    assert_eq!(snapshot.players.len(), 1);
    assert!(host.drain().is_empty(), "no broadcast for a failed kick");
}

#[tokio::test]
async fn fifth_profile_is_rejected_and_snapshot_unchanged() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    for profile in ["p2", "p3", "p4"] {
        let guest = connect(&server);
        server
            .handle_join_room(guest.connection_id, room_id.clone(), profile.to_string())
            .await
            .unwrap();
    }

    let fifth = connect(&server);
    let err = server
        .handle_join_room(fifth.connection_id, room_id.clone(), "p5".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, crate::protocol::LobbyError::Conflict(_)));

    let snapshot = server.room_view(&room_id).await.unwrap();
    assert_eq!(snapshot.players.len(), 4);
    assert!(snapshot.players.iter().all(|p| p.profile_id != "p5"));
}

#[tokio::test]
async fn unknown_profile_cannot_join() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let room_id = create_room(&server, &mut host, "p1").await;

    let stranger = connect(&server);
    let err = server
        .handle_join_room(stranger.connection_id, room_id, "ghost".to_string())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        crate::protocol::LobbyError::ProfileUnknown(_)
    ));
}

#[tokio::test]
async fn reconnect_replaces_connection_without_duplicating_membership() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let room_id = create_room(&server, &mut host, "p1").await;

    let mut guest_first = connect(&server);
    server
        .handle_join_room(guest_first.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    guest_first.drain();

    let guest_second = connect(&server);
    server
        .handle_join_room(guest_second.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();

    let snapshot = server.room_view(&room_id).await.unwrap();
    assert_eq!(snapshot.players.len(), 2);
    let member = snapshot
        .players
        .iter()
        .find(|p| p.profile_id == "p2")
        .unwrap();
    assert_eq!(member.connection_id, Some(guest_second.connection_id));
}

#[tokio::test]
async fn departing_member_receives_the_final_snapshot() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let mut guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    host.drain();
    guest.drain();

    server
        .handle_leave_room(guest.connection_id, room_id.clone(), None)
        .await
        .unwrap();

    // The leaver is still attached for the final delivery, and the state it
    // reconciles to no longer contains it.
    let snapshot = guest.wait_for(as_snapshot).await;
    assert!(snapshot.players.iter().all(|p| p.profile_id != "p2"));
    assert_eq!(server.connections.room_of(&guest.connection_id), None);

    let snapshot = host.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players.len(), 1);
}

#[tokio::test]
async fn host_explicit_leave_ends_the_room() {
    let server = seeded_server(ServerTuning::default());
    let mut host = connect(&server);
    let mut guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();
    guest.drain();

    server
        .handle_leave_room(host.connection_id, room_id.clone(), Some("p1".to_string()))
        .await
        .unwrap();

    let reason = guest
        .wait_for(|frame| match frame {
            ServerFrame::Message(ServerMessage::RoomClosed { reason, .. }) => Some(reason.clone()),
            _ => None,
        })
        .await;
    assert_eq!(reason, "host_left");
    assert!(!server.registry.contains(&room_id));
}

#[tokio::test]
async fn snapshot_appearance_tracks_the_store() {
    let store = Arc::new(InMemoryProfileStore::new());
    store.seed(ProfileRecord {
        id: "p1".to_string(),
        name: "Ada".to_string(),
        color: Some("#FF0000".to_string()),
        emoji: Some("🦀".to_string()),
    });
    let server = LobbyServer::with_stores(ServerTuning::default(), store.clone(), store.clone());

    let mut host = connect(&server);
    let room_id = create_room(&server, &mut host, "p1").await;
    let snapshot = host.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players[0].color, "#FF0000");

    // The player changes appearance out-of-band; the very next snapshot
    // reflects it.
    store.seed(ProfileRecord {
        id: "p1".to_string(),
        name: "Ada".to_string(),
        color: Some("#ABCDEF".to_string()),
        emoji: Some("🌈".to_string()),
    });
    host.drain();
    server
        .handle_request_snapshot(host.connection_id, room_id)
        .await
        .unwrap();
    let snapshot = host.wait_for(as_snapshot).await;
    assert_eq!(snapshot.players[0].color, "#ABCDEF");
    assert_eq!(snapshot.players[0].emoji, "🌈");
}

#[tokio::test]
async fn stale_sweep_empties_and_ends_the_room() {
    let tuning = ServerTuning {
        stale_member_timeout_secs: 0,
        ..ServerTuning::default()
    };
    let server = seeded_server(tuning);
    let mut host = connect(&server);
    let guest = connect(&server);

    let room_id = create_room(&server, &mut host, "p1").await;
    server
        .handle_join_room(guest.connection_id, room_id.clone(), "p2".to_string())
        .await
        .unwrap();

    // Zero threshold: everything is stale immediately.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let removed = server.cleanup_stale(false, None).await;
    assert_eq!(removed, 2);
    assert!(!server.registry.contains(&room_id));
}
