#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use arcade_lobby_server::config;
use arcade_lobby_server::http;
use arcade_lobby_server::logging;
use arcade_lobby_server::server::LobbyServer;
use arcade_lobby_server::websocket;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Arcade Lobby -- authoritative coordination server for a multiplayer
/// arcade lobby
#[derive(Parser, Debug)]
#[command(name = "arcade-lobby-server")]
#[command(about = "Real-time room coordination server for a multiplayer arcade lobby")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if cli.validate_config {
        println!("Configuration validation passed");
        println!();
        println!("Configuration summary:");
        println!("  Port: {}", cfg.port);
        println!("  Max players per room: {}", cfg.server.max_players);
        println!("  Host grace window: {}s", cfg.server.host_grace_secs);
        println!(
            "  Profile backend: {}",
            cfg.upstream.backend_url.as_deref().unwrap_or("in-memory")
        );
        println!("  CORS origins: {}", cors_origins_summary(&cfg));
        return Ok(());
    }

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting arcade lobby server");

    let server = LobbyServer::from_config(&cfg)?;

    // Janitor loop; stops when the shutdown token cancels.
    let maintenance_server = server.clone();
    tokio::spawn(async move {
        maintenance_server.run_maintenance().await;
    });

    let app = Router::new()
        .merge(websocket::ws_router())
        .merge(http::api_router())
        .fallback(|| async {
            "Arcade Lobby Server. Connect via /ws; REST surface under /api, health at /health."
        })
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&cfg))
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cors_origins_summary(&cfg),
        "Server started - WebSocket: /ws, Health: /health"
    );

    let shutdown_server = server.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown_server.shutdown();
        })
        .await?;

    Ok(())
}

/// CORS: permissive by default, else the configured list plus the deployed
/// client URL.
fn build_cors(cfg: &config::Config) -> CorsLayer {
    if cfg.cors_origins == "*" && cfg.client_url.is_none() {
        return CorsLayer::permissive();
    }

    let mut origins: Vec<axum::http::HeaderValue> = cfg
        .cors_origins
        .split(',')
        .filter(|s| *s != "*")
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if let Some(client_url) = &cfg.client_url {
        if let Ok(value) = client_url.parse() {
            origins.push(value);
        }
    }

    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, using permissive CORS");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn cors_origins_summary(cfg: &config::Config) -> String {
    match &cfg.client_url {
        Some(client_url) => format!("{},{client_url}", cfg.cors_origins),
        None => cfg.cors_origins.clone(),
    }
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["arcade-lobby-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["arcade-lobby-server", "-c"]).unwrap();
        assert!(cli.validate_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        let result =
            Cli::try_parse_from(["arcade-lobby-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
    }
}
