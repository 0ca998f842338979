use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ServerTuning};
use crate::profile::{HttpProfileStore, InMemoryProfileStore, MatchStore, ProfileStore};
use crate::protocol::ProfileId;
use crate::room::RoomRegistry;

mod admin;
mod authority;
mod connection_manager;
mod game_relay;
mod host_grace;
mod lobby;
mod maintenance;
mod message_router;
mod messaging;
mod ready_state;
mod room_service;
#[cfg(test)]
mod room_service_tests;
mod snapshot;

pub use connection_manager::ConnectionManager;

/// The authoritative coordination server: owns the room registry, the
/// connection table, and the read-through boundary to the profile and
/// match stores. Constructed once at startup; every handler works through
/// an `Arc` of this.
pub struct LobbyServer {
    /// Room id -> room, plus the recently-ended ghost set.
    pub(crate) registry: RoomRegistry,
    /// Live socket table; also models the lobby channel (connections with
    /// no room assignment).
    pub(crate) connections: ConnectionManager,
    /// Authoritative source for display identity.
    pub(crate) profiles: Arc<dyn ProfileStore>,
    /// Read-only win records.
    pub(crate) matches: Arc<dyn MatchStore>,
    pub(crate) tuning: ServerTuning,
    /// Profiles flagged active via the HTTP surface. Membership only.
    pub(crate) active_sessions: DashMap<ProfileId, DateTime<Utc>>,
    pub(crate) started_at: std::time::Instant,
    /// Cancels maintenance loops and armed grace timers on shutdown.
    pub(crate) shutdown: CancellationToken,
    /// Back-reference for handlers that spawn follow-up work.
    self_ref: Weak<LobbyServer>,
}

impl LobbyServer {
    /// Build from loaded configuration. With no backend URL configured the
    /// server runs against an in-memory profile store.
    pub fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        let (profiles, matches): (Arc<dyn ProfileStore>, Arc<dyn MatchStore>) =
            match &config.upstream.backend_url {
                Some(url) => {
                    let store = Arc::new(HttpProfileStore::new(
                        url,
                        config.upstream.api_key.as_deref(),
                        Duration::from_millis(config.upstream.request_timeout_ms),
                    )?);
                    tracing::info!(backend_url = %url, "Using remote profile/match backend");
                    (store.clone(), store)
                }
                None => {
                    tracing::warn!(
                        "No profile backend configured; running with an in-memory store"
                    );
                    let store = Arc::new(InMemoryProfileStore::new());
                    (store.clone(), store)
                }
            };
        Ok(Self::with_stores(config.server.clone(), profiles, matches))
    }

    /// Build with explicit stores. Used by tests and by `from_config`.
    pub fn with_stores(
        tuning: ServerTuning,
        profiles: Arc<dyn ProfileStore>,
        matches: Arc<dyn MatchStore>,
    ) -> Arc<Self> {
        let recently_ended_ttl = Duration::from_secs(tuning.recently_ended_ttl_secs);
        Arc::new_cyclic(|self_ref| Self {
            registry: RoomRegistry::new(recently_ended_ttl),
            connections: ConnectionManager::new(tuning.outbound_queue_size),
            profiles,
            matches,
            tuning,
            active_sessions: DashMap::new(),
            started_at: std::time::Instant::now(),
            shutdown: CancellationToken::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// Upgradeable handle for spawned follow-up work. `None` only during
    /// teardown.
    pub(crate) fn arc(&self) -> Option<Arc<Self>> {
        self.self_ref.upgrade()
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn profiles(&self) -> &dyn ProfileStore {
        self.profiles.as_ref()
    }

    pub fn matches(&self) -> &dyn MatchStore {
        self.matches.as_ref()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel maintenance loops and every armed grace timer.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub(crate) fn host_grace_window(&self) -> Duration {
        Duration::from_secs(self.tuning.host_grace_secs)
    }

    pub(crate) fn profile_read_timeout(&self) -> Duration {
        Duration::from_millis(self.tuning.profile_read_timeout_ms)
    }

    pub(crate) fn stale_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tuning.stale_member_timeout_secs as i64)
    }
}
