//! AIS relay server
//!
//! Subscribes once to the AIS feed and relays every message to WebSocket
//! clients connected at `ws://127.0.0.1:<port>/ais`.
//!
//! # Usage
//!
//! ```bash
//! # Key from the environment, default port 3002
//! VITE_AISSTREAM_API_KEY=... ais-relay
//!
//! # Key from ./.env, custom port
//! AIS_PROXY_PORT=4000 ais-relay
//!
//! # Debug logging
//! RUST_LOG=ais_relay=debug ais-relay
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use ais_relay::client::{FeedConfig, FeedConnector};
use ais_relay::config::{resolve_api_key, API_KEY_VAR, PORT_VAR};
use ais_relay::registry::BroadcastRegistry;
use ais_relay::server::config::DEFAULT_PORT;
use ais_relay::server::{RelayServer, ServerConfig};
use ais_relay::stats::RelayStats;

#[derive(Parser, Debug)]
#[command(name = "ais-relay", version, about = "AIS feed WebSocket relay")]
struct Args {
    /// Port to listen on (loopback only)
    #[arg(long, env = PORT_VAR, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Feed API key (overridden by the env file)
    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,

    /// Env file searched for a VITE_AISSTREAM_API_KEY= line
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Feed WebSocket URL
    #[arg(long, env = "AIS_FEED_URL", default_value = ais_relay::client::config::DEFAULT_FEED_URL)]
    feed_url: String,

    /// Seconds to wait before reconnecting to the feed
    #[arg(long, env = "AIS_RECONNECT_DELAY_SECS", default_value_t = 5)]
    reconnect_delay_secs: u64,

    /// Message types to subscribe to (comma-separated; default set if empty)
    #[arg(long, env = "AIS_MESSAGE_TYPES", value_delimiter = ',')]
    message_types: Vec<String>,

    /// Queued messages per client before it is dropped as too slow
    #[arg(long, env = "AIS_CLIENT_QUEUE", default_value_t = 1024)]
    client_queue: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Process-wide TLS crypto provider for the wss:// feed connection.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let api_key = resolve_api_key(args.api_key.as_deref(), &args.env_file)
        .context("Failed to resolve feed API key")?;

    let feed_config = FeedConfig::new(api_key)?
        .url(args.feed_url)
        .message_types(args.message_types)
        .reconnect_delay(Duration::from_secs(args.reconnect_delay_secs));

    let server_config = ServerConfig::default()
        .port(args.port)
        .client_queue_capacity(args.client_queue);

    let registry = Arc::new(BroadcastRegistry::new());
    let stats = Arc::new(RelayStats::new());

    let server = RelayServer::bind(server_config, Arc::clone(&registry), Arc::clone(&stats))
        .await
        .with_context(|| format!("Failed to bind 127.0.0.1:{}", args.port))?;
    let addr = server.local_addr();

    info!(
        feed = %feed_config.url,
        message_types = ?feed_config.message_types,
        "Starting feed connector"
    );
    let feed = FeedConnector::new(feed_config, registry, stats).spawn();

    info!("Relay ready at ws://{}/ais  |  health: http://{}/health", addr, addr);

    let served = server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    feed.abort();
    served.context("Relay server failed")?;
    info!("Relay stopped");
    Ok(())
}
