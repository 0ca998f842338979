//! Remote profile/match backend connection settings.

use serde::{Deserialize, Serialize};

use super::defaults::default_upstream_timeout_ms;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the profile/match backend. Unset runs the server against
    /// an in-memory store.
    #[serde(default)]
    pub backend_url: Option<String>,
    /// API key forwarded on every backend request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request deadline for backend calls (milliseconds).
    #[serde(default = "default_upstream_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_key: None,
            request_timeout_ms: default_upstream_timeout_ms(),
        }
    }
}
