use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::protocol::{generate_room_id, LobbyError, RoomId};

use super::state::{PlayerState, Room};

/// A room behind its per-room lock. Every mutation and every snapshot
/// preparation holds this lock; fan-out never does.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Owns the id → room mapping. Generates ids, creates, looks up, deletes,
/// and remembers recently-ended ids briefly so stale listings filter them
/// out.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, SharedRoom>,
    recently_ended: DashMap<RoomId, Instant>,
    recently_ended_ttl: Duration,
    total_created: AtomicU64,
}

impl RoomRegistry {
    pub fn new(recently_ended_ttl: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            recently_ended: DashMap::new(),
            recently_ended_ttl,
            total_created: AtomicU64::new(0),
        }
    }

    /// Create a room with the given host as its first member. Ids are drawn
    /// at random; collision with a live room regenerates.
    pub fn create(&self, host: PlayerState) -> (RoomId, SharedRoom) {
        loop {
            let id = generate_room_id();
            match self.rooms.entry(id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    let room = Arc::new(Mutex::new(Room::new(id.clone(), host.clone())));
                    entry.insert(room.clone());
                    self.total_created.fetch_add(1, Ordering::Relaxed);
                    return (id, room);
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<SharedRoom, LobbyError> {
        self.rooms
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LobbyError::RoomNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    /// Remove a room. Idempotent; the id is remembered for the configured
    /// TTL so lobby listings filter out the ghost.
    pub fn remove(&self, id: &str) -> Option<SharedRoom> {
        let removed = self.rooms.remove(id).map(|(_, room)| room);
        if removed.is_some() {
            self.recently_ended.insert(id.to_string(), Instant::now());
        }
        removed
    }

    pub fn was_recently_ended(&self, id: &str) -> bool {
        self.recently_ended
            .get(id)
            .is_some_and(|ended| ended.elapsed() < self.recently_ended_ttl)
    }

    /// Drop remembered ids older than the TTL.
    pub fn purge_recently_ended(&self) -> usize {
        let ttl = self.recently_ended_ttl;
        let before = self.recently_ended.len();
        self.recently_ended.retain(|_, ended| ended.elapsed() < ttl);
        before - self.recently_ended.len()
    }

    pub fn list(&self) -> Vec<(RoomId, SharedRoom)> {
        self.rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn total_created(&self) -> u64 {
        self.total_created.load(Ordering::Relaxed)
    }
}
