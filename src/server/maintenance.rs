use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{CloseReason, LeaveReason, RoomId};

use super::LobbyServer;

impl LobbyServer {
    /// Janitor loop. Three cadences: empty-room sweep, stale-member sweep,
    /// and recently-ended/orphan purge. Every removal goes through the
    /// standard reconciler paths so the room invariants hold on return.
    pub async fn run_maintenance(self: Arc<Self>) {
        let mut empty_sweep =
            tokio::time::interval(Duration::from_secs(self.tuning.empty_room_sweep_secs.max(1)));
        let mut stale_sweep =
            tokio::time::interval(Duration::from_secs(self.tuning.stale_sweep_secs.max(1)));
        let mut ghost_purge =
            tokio::time::interval(Duration::from_secs(self.tuning.recently_ended_ttl_secs.max(1)));

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::info!("Maintenance loop stopped");
                    break;
                }
                _ = empty_sweep.tick() => {
                    self.sweep_empty_rooms().await;
                }
                _ = stale_sweep.tick() => {
                    let removed = self.cleanup_stale(false, None).await;
                    if removed > 0 {
                        tracing::info!(removed, "Stale sweep removed players");
                    }
                }
                _ = ghost_purge.tick() => {
                    let purged = self.registry.purge_recently_ended();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged recently-ended room ids");
                    }
                    self.reap_orphan_connections().await;
                }
            }
        }
    }

    /// Drop rooms with zero members that escaped inline cleanup.
    pub(crate) async fn sweep_empty_rooms(&self) {
        for (room_id, room) in self.registry.list() {
            let empty = {
                let guard = room.lock().await;
                guard.member_count() == 0 && !guard.host_grace_armed()
            };
            if empty {
                tracing::info!(%room_id, "Sweeping empty room");
                self.end_room(&room_id, CloseReason::Cleanup, "The room is empty")
                    .await;
            }
        }
    }

    /// Remove members of rooms whose last activity is older than the stale
    /// threshold, via the standard removal path. `force` skips the
    /// threshold; `scope` restricts the sweep to one room. Returns the
    /// number of members removed.
    pub async fn cleanup_stale(&self, force: bool, scope: Option<RoomId>) -> usize {
        let rooms = match scope {
            Some(room_id) => match self.registry.get(&room_id) {
                Ok(room) => vec![(room_id, room)],
                Err(_) => return 0,
            },
            None => self.registry.list(),
        };

        let threshold = self.stale_threshold();
        let mut removed = 0usize;

        for (room_id, room) in rooms {
            let profiles = {
                let guard = room.lock().await;
                if !force && !guard.is_stale(threshold) {
                    continue;
                }
                // Host last: the room stays invariant-clean while the
                // other removals drain it.
                let mut profiles: Vec<String> = guard
                    .members()
                    .iter()
                    .map(|m| m.profile_id.clone())
                    .collect();
                let host = guard.host_profile_id.clone();
                profiles.sort_by_key(|p| *p == host);
                profiles
            };

            for profile_id in profiles {
                match self
                    .remove_member_standard(&room_id, &profile_id, LeaveReason::Stale)
                    .await
                {
                    Ok(()) => removed += 1,
                    // The room ended mid-sweep; the rest are gone with it.
                    Err(_) => break,
                }
            }
        }

        removed
    }

    /// Detach connections that reference rooms the registry no longer
    /// holds, and stragglers on live room channels.
    pub(crate) async fn reap_orphan_connections(&self) {
        let mut room_ids: Vec<RoomId> = Vec::new();
        for connection_id in self.connections.all_connections() {
            if let Some(room_id) = self.connections.room_of(&connection_id) {
                if self.registry.contains(&room_id) {
                    if !room_ids.contains(&room_id) {
                        room_ids.push(room_id);
                    }
                } else {
                    tracing::debug!(%connection_id, %room_id, "Detaching connection from dead room");
                    self.connections.clear_room(&connection_id);
                }
            }
        }
        for room_id in room_ids {
            self.reap_room_stragglers(&room_id).await;
        }
    }
}
