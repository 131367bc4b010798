//! Downstream WebSocket server
//!
//! Serves subscribers on a loopback port through an axum router, checks the
//! request path, and keeps each accepted connection registered in the
//! broadcast registry until it closes.

pub mod config;
mod connection;
pub mod health;
pub mod listener;
mod router;

pub use config::ServerConfig;
pub use health::HealthResponse;
pub use listener::RelayServer;
