//! WebSocket upgrade route and the per-connection socket loop.

mod connection;
mod routes;

pub use routes::ws_router;
