//! HTTP routes
//!
//! One axum router serves the relay path, the health document and a fallback.
//! A WebSocket upgrade to any path other than the relay path, `/health`
//! included, is completed and then closed with 4004. Plain requests to
//! unknown paths get 404.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;

use crate::registry::{BroadcastRegistry, ClientId};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::health::HealthResponse;
use crate::stats::RelayStats;

/// Shared state handed to every handler
#[derive(Clone)]
pub(crate) struct RelayState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<BroadcastRegistry>,
    pub stats: Arc<RelayStats>,
    next_client_id: Arc<AtomicU64>,
}

impl RelayState {
    pub fn new(
        config: ServerConfig,
        registry: Arc<BroadcastRegistry>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            stats,
            next_client_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn connection(&self, peer_addr: SocketAddr) -> Connection {
        let client_id = ClientId(self.next_client_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(client_id = %client_id, peer = %peer_addr, "New connection");

        Connection::new(
            client_id,
            peer_addr,
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
        )
    }

    fn health(&self) -> HealthResponse {
        HealthResponse::ok(
            self.config.bind_addr.port(),
            self.registry.len(),
            self.stats.snapshot(),
        )
    }
}

/// Build the router with all routes
pub(crate) fn router(state: RelayState) -> Router {
    let relay_path = state.config.relay_path.clone();
    let health_path = state.config.health_path.clone();

    Router::new()
        .route(&relay_path, get(relay_handler))
        .route(&health_path, get(health_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

/// GET /ais: upgrade and relay
async fn relay_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
) -> Response {
    let connection = state.connection(peer_addr);
    ws.on_upgrade(move |socket| connection.serve(socket))
}

/// GET /health: status document, or 4004 for a WebSocket upgrade
async fn health_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<RelayState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    match upgrade {
        Ok(ws) => reject(ws, &state, peer_addr, &uri),
        Err(_) => Json(state.health()).into_response(),
    }
}

async fn fallback_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<RelayState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    match upgrade {
        Ok(ws) => reject(ws, &state, peer_addr, &uri),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn reject(ws: WebSocketUpgrade, state: &RelayState, peer_addr: SocketAddr, uri: &Uri) -> Response {
    let connection = state.connection(peer_addr);
    let path = uri.path().to_string();
    ws.on_upgrade(move |socket| connection.reject(socket, path))
}
