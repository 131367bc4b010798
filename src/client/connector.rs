//! Upstream feed connector
//!
//! Keeps one subscription to the feed alive for the lifetime of the process.
//! Each connection instance goes through connect, subscribe and relay; any
//! failure ends the instance, and after a fixed delay a new one starts.
//!
//! ```text
//!   Connecting ──► Subscribed ──► Disconnected ──► Backoff ──┐
//!       ▲                                                    │
//!       └────────────────────────────────────────────────────┘
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::registry::{BroadcastRegistry, Payload};
use crate::stats::RelayStats;

use super::config::FeedConfig;

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// Opening the connection
    Connecting,
    /// Subscription sent; relaying messages
    Subscribed,
    /// Connection instance ended
    Disconnected,
    /// Waiting out the reconnect delay
    Backoff,
}

impl std::fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeedPhase::Connecting => "connecting",
            FeedPhase::Subscribed => "subscribed",
            FeedPhase::Disconnected => "disconnected",
            FeedPhase::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

/// Error document the feed sends in place of data, e.g. for a bad API key
#[derive(Debug, Deserialize)]
struct FeedErrorBody {
    error: String,
}

/// Return the feed's error message if the payload is an error document.
///
/// Only used for logging; the payload is forwarded either way.
fn feed_error(payload: &Payload) -> Option<String> {
    const MARKER: &[u8] = b"\"error\"";

    let bytes = payload.as_bytes();
    if !bytes.windows(MARKER.len()).any(|w| w == MARKER) {
        return None;
    }
    serde_json::from_slice::<FeedErrorBody>(bytes)
        .ok()
        .map(|body| body.error)
}

/// Supervises the upstream subscription and feeds the registry
pub struct FeedConnector {
    config: FeedConfig,
    registry: Arc<BroadcastRegistry>,
    stats: Arc<RelayStats>,
    phase_tx: watch::Sender<FeedPhase>,
}

impl FeedConnector {
    pub fn new(
        config: FeedConfig,
        registry: Arc<BroadcastRegistry>,
        stats: Arc<RelayStats>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(FeedPhase::Connecting);
        Self {
            config,
            registry,
            stats,
            phase_tx,
        }
    }

    /// Watch phase transitions
    pub fn phase(&self) -> watch::Receiver<FeedPhase> {
        self.phase_tx.subscribe()
    }

    /// Run the supervisory loop on a new task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Supervisory loop.
    ///
    /// Never returns: every failure is logged, followed by the reconnect
    /// delay and a fresh attempt.
    pub async fn run(self) {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            self.set_phase(FeedPhase::Connecting);
            tracing::info!(url = %self.config.url, attempt, "Connecting to feed");

            let error = match self.run_once().await {
                Ok(never) => match never {},
                Err(e) => e,
            };

            self.stats.record_upstream_failure();
            self.set_phase(FeedPhase::Disconnected);
            tracing::warn!(
                error = %error,
                attempt,
                delay_secs = self.config.reconnect_delay.as_secs_f64(),
                "Feed connection lost, reconnecting"
            );

            self.set_phase(FeedPhase::Backoff);
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// One connection instance: connect, subscribe, relay until failure
    async fn run_once(&self) -> Result<Infallible> {
        let mut ws = self.connect_and_subscribe().await?;
        self.stats.record_upstream_connect();
        self.set_phase(FeedPhase::Subscribed);
        tracing::info!(
            clients = self.registry.len(),
            "Subscribed to feed, relaying"
        );

        self.relay(&mut ws).await
    }

    async fn connect_and_subscribe(&self) -> Result<FeedStream> {
        let timeout = self.config.connect_timeout;
        let (mut ws, _response) =
            match tokio::time::timeout(timeout, connect_async(self.config.url.as_str())).await {
                Ok(connected) => connected?,
                Err(_) => return Err(Error::HandshakeTimeout(timeout)),
            };

        let request = self.config.subscription_request();
        ws.send(Message::text(request.to_json()?)).await?;
        tracing::debug!(
            message_types = ?request.filter_message_types(),
            bounding_boxes = request.bounding_boxes().len(),
            "Sent subscription"
        );

        Ok(ws)
    }

    async fn relay(&self, ws: &mut FeedStream) -> Result<Infallible> {
        while let Some(message) = ws.next().await {
            let message = message?;

            if let Message::Close(frame) = &message {
                tracing::info!(frame = ?frame, "Feed sent close frame");
                break;
            }

            if let Some(payload) = Payload::from_message(message) {
                self.forward(payload);
            }
        }

        Err(Error::UpstreamClosed)
    }

    fn forward(&self, payload: Payload) {
        if let Some(message) = feed_error(&payload) {
            tracing::warn!(error = %message, "Feed reported an error");
        }

        let outcome = self.registry.broadcast(&payload);
        self.stats.record_relayed(payload.len(), outcome.evicted);

        tracing::trace!(
            bytes = payload.len(),
            delivered = outcome.delivered,
            evicted = outcome.evicted,
            "Relayed message"
        );
    }

    fn set_phase(&self, phase: FeedPhase) {
        self.phase_tx.send_replace(phase);
        tracing::debug!(phase = %phase, "Feed phase");
    }
}
