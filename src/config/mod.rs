//! Configuration: layered JSON file + environment loading with sensible
//! compiled-in defaults.
//!
//! - [`server`]: room and janitor tuning
//! - [`upstream`]: profile/match backend connection settings
//! - [`logging`]: log output configuration
//! - [`crate::config::loader`]: loading and precedence rules

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod server;
pub mod upstream;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerTuning;
pub use upstream::UpstreamConfig;

use serde::{Deserialize, Serialize};

use defaults::{default_cors_origins, default_port};

/// Root configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Additional allowed CORS origin (the deployed client URL).
    #[serde(default)]
    pub client_url: Option<String>,
    /// Comma-separated CORS origins, or "*" for permissive.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    #[serde(default)]
    pub server: ServerTuning,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            client_url: None,
            cors_origins: default_cors_origins(),
            server: ServerTuning::default(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3210);
        assert_eq!(config.cors_origins, "*");
        assert_eq!(config.server.max_players, 4);
        assert_eq!(config.server.host_grace_secs, 60);
        assert_eq!(config.server.stale_member_timeout_secs, 600);
        assert_eq!(config.server.recently_ended_ttl_secs, 30);
        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.rotation, "daily");
        assert!(config.upstream.backend_url.is_none());
    }

    #[test]
    fn config_serialization_round_trips() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.port, deserialized.port);
        assert_eq!(config.server.max_players, deserialized.server.max_players);
        assert_eq!(
            config.server.host_grace_secs,
            deserialized.server.host_grace_secs
        );
    }

    #[test]
    fn log_level_parsing_accepts_synonyms() {
        let level: LogLevel = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(serde_json::from_str::<LogLevel>("\"loud\"").is_err());
    }
}
