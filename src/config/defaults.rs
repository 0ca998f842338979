//! Default value functions referenced by the serde derives.

pub fn default_port() -> u16 {
    3210
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub fn default_max_players() -> usize {
    crate::protocol::MAX_PLAYERS
}

pub fn default_host_grace_secs() -> u64 {
    60
}

pub fn default_empty_room_sweep_secs() -> u64 {
    60
}

pub fn default_stale_sweep_secs() -> u64 {
    300
}

pub fn default_stale_member_timeout_secs() -> u64 {
    600
}

pub fn default_recently_ended_ttl_secs() -> u64 {
    30
}

pub fn default_outbound_queue_size() -> usize {
    64
}

pub fn default_profile_read_timeout_ms() -> u64 {
    2_000
}

pub fn default_upstream_timeout_ms() -> u64 {
    3_000
}

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub fn default_enable_file_logging() -> bool {
    false
}
