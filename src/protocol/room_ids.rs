use rand::Rng;

use super::types::RoomId;

const ROOM_ID_MIN: u32 = 100_000;
const ROOM_ID_MAX: u32 = 999_999;

/// Generate a six-digit numeric room id, uniformly at random. Collision with
/// a live room is handled by the registry, which regenerates.
pub fn generate_room_id() -> RoomId {
    let mut rng = rand::rng();
    rng.random_range(ROOM_ID_MIN..=ROOM_ID_MAX).to_string()
}

/// Validate the shape of a client-supplied room id.
pub fn is_valid_room_id(candidate: &str) -> bool {
    candidate.len() == 6 && candidate.chars().all(|c| c.is_ascii_digit()) && !candidate.starts_with('0')
}
