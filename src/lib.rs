//! WebSocket fan-out relay for a live AIS position-report feed
//!
//! One upstream subscription, any number of downstream subscribers. Every
//! frame received from the feed is forwarded unmodified to every connected
//! client.
//!
//! # Architecture
//!
//! ```text
//!   feed (wss) ──► FeedConnector ──► BroadcastRegistry ──► Connection ──► client
//!                  reconnects        Arc-shared set         one task    ws://…/ais
//!                  with fixed delay  of client queues       per client
//! ```
//!
//! The connector ([`client`]) and the listener ([`server`]) run as independent
//! tasks and only meet in the [`registry`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use ais_relay::client::{FeedConfig, FeedConnector};
//! use ais_relay::registry::BroadcastRegistry;
//! use ais_relay::server::{RelayServer, ServerConfig};
//! use ais_relay::stats::RelayStats;
//!
//! # async fn example() -> ais_relay::error::Result<()> {
//! let registry = Arc::new(BroadcastRegistry::new());
//! let stats = Arc::new(RelayStats::new());
//!
//! let server = RelayServer::bind(ServerConfig::default(), registry.clone(), stats.clone()).await?;
//! FeedConnector::new(FeedConfig::new("api-key")?, registry, stats).spawn();
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{FeedConfig, FeedConnector};
pub use error::{Error, Result};
pub use registry::BroadcastRegistry;
pub use server::{RelayServer, ServerConfig};
