//! Error types
//!
//! Registry operations never fail; errors only surface from the network edges
//! and from configuration.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error type for relay operations
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feed connect and WebSocket handshake did not finish in time
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// Upstream feed ended the stream (close frame or EOF)
    #[error("Upstream closed the connection")]
    UpstreamClosed,
}

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;
