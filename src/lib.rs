#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_arguments,
    clippy::too_many_lines
)]

//! # Arcade Lobby Server
//!
//! Authoritative real-time coordination server for a multiplayer arcade
//! lobby: ephemeral rooms, profile-keyed membership, host authority with a
//! reconnect grace window, snapshot fan-out, and a janitorial cleanup loop.
//!
//! Room state lives in memory only; the external profile store stays
//! authoritative for player appearance.

/// Server configuration and environment variables
pub mod config;

/// REST read/admin surface
pub mod http;

/// Structured logging configuration
pub mod logging;

/// Read-through to the remote profile and match stores
pub mod profile;

/// Wire protocol definitions
pub mod protocol;

/// Room entity, state machine, and registry
pub mod room;

/// Main server orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
