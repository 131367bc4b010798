//! Downstream listener
//!
//! Binds the loopback port and serves the relay router on it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::BroadcastRegistry;
use crate::server::config::ServerConfig;
use crate::server::router::{router, RelayState};
use crate::stats::RelayStats;

/// Downstream WebSocket server
///
/// Binding happens up front in [`RelayServer::bind`] so that a port conflict
/// fails startup before any task is spawned.
pub struct RelayServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: RelayState,
}

impl RelayServer {
    /// Bind the listening socket
    pub async fn bind(
        config: ServerConfig,
        registry: Arc<BroadcastRegistry>,
        stats: Arc<RelayStats>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        // Report the real port when bound to port 0.
        let config = ServerConfig {
            bind_addr: local_addr,
            ..config
        };

        tracing::info!(
            addr = %local_addr,
            path = %config.relay_path,
            health = %config.health_path,
            "Relay server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            state: RelayState::new(config, registry, stats),
        })
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a reference to the broadcast registry
    pub fn registry(&self) -> &Arc<BroadcastRegistry> {
        &self.state.registry
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Serve until `shutdown` resolves
    ///
    /// Open WebSocket connections run on their own tasks and are not waited
    /// for.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state).into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}
