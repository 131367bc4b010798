//! `/health` response body

use serde::Serialize;

use crate::stats::StatsSnapshot;

/// Health check response body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running
    pub status: &'static str,
    /// Listening port
    pub port: u16,
    /// Currently registered clients
    pub clients: usize,
    /// Relay counters
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

impl HealthResponse {
    /// Status document for a running server
    pub fn ok(port: u16, clients: usize, stats: StatsSnapshot) -> Self {
        Self {
            status: "ok",
            port,
            clients,
            stats,
        }
    }
}
