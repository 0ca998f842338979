//! Room and janitor tuning.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_empty_room_sweep_secs, default_host_grace_secs, default_max_players,
    default_outbound_queue_size, default_profile_read_timeout_ms, default_recently_ended_ttl_secs,
    default_stale_member_timeout_secs, default_stale_sweep_secs,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerTuning {
    /// Room capacity.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Seconds a dropped host may take to reconnect before the room ends.
    #[serde(default = "default_host_grace_secs")]
    pub host_grace_secs: u64,
    /// Interval of the empty-room sweep (seconds).
    #[serde(default = "default_empty_room_sweep_secs")]
    pub empty_room_sweep_secs: u64,
    /// Interval of the stale-member sweep (seconds).
    #[serde(default = "default_stale_sweep_secs")]
    pub stale_sweep_secs: u64,
    /// Inactivity threshold after which a room's members count as stale.
    #[serde(default = "default_stale_member_timeout_secs")]
    pub stale_member_timeout_secs: u64,
    /// How long ended room ids stay filtered out of listings.
    #[serde(default = "default_recently_ended_ttl_secs")]
    pub recently_ended_ttl_secs: u64,
    /// Bounded per-connection outbound queue; overflow marks the
    /// connection lost.
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
    /// Deadline for one profile read during snapshot preparation.
    #[serde(default = "default_profile_read_timeout_ms")]
    pub profile_read_timeout_ms: u64,
}

impl Default for ServerTuning {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            host_grace_secs: default_host_grace_secs(),
            empty_room_sweep_secs: default_empty_room_sweep_secs(),
            stale_sweep_secs: default_stale_sweep_secs(),
            stale_member_timeout_secs: default_stale_member_timeout_secs(),
            recently_ended_ttl_secs: default_recently_ended_ttl_secs(),
            outbound_queue_size: default_outbound_queue_size(),
            profile_read_timeout_ms: default_profile_read_timeout_ms(),
        }
    }
}
