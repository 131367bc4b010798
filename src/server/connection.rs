//! Per-connection handler
//!
//! Drives one upgraded downstream socket through `Connecting → Open → Closed`.
//! Sockets on the relay path stream queued payloads to the client while
//! discarding anything the client sends; any other path is closed with 4004.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::registry::{BroadcastRegistry, ClientHandle, ClientId};
use crate::server::config::{ServerConfig, WRONG_PATH_CLOSE_CODE};
use crate::session::{CloseReason, SessionState};
use crate::stats::RelayStats;

/// How long to wait for the client to acknowledge a close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// A single downstream connection
pub(crate) struct Connection {
    state: SessionState,
    config: Arc<ServerConfig>,
    registry: Arc<BroadcastRegistry>,
    stats: Arc<RelayStats>,
}

impl Connection {
    pub(crate) fn new(
        id: ClientId,
        peer_addr: SocketAddr,
        config: Arc<ServerConfig>,
        registry: Arc<BroadcastRegistry>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            state: SessionState::new(id, peer_addr),
            config,
            registry,
            stats,
        }
    }

    /// Close a socket that asked for the wrong path. It is never registered.
    pub(crate) async fn reject(mut self, mut socket: WebSocket, path: String) {
        self.stats.record_client_rejected();
        tracing::info!(
            client_id = %self.state.id,
            peer = %self.state.peer_addr,
            path = %path,
            "Rejected connection on wrong path"
        );

        let frame = CloseFrame {
            code: WRONG_PATH_CLOSE_CODE,
            reason: self.config.wrong_path_reason().into(),
        };
        self.state.close(CloseReason::Rejected { path });
        if let Err(e) = socket.send(Message::Close(Some(frame))).await {
            tracing::debug!(client_id = %self.state.id, error = %e, "Failed to send close frame");
            return;
        }

        // Let the client acknowledge the close before the socket drops.
        let _ = tokio::time::timeout(CLOSE_GRACE, async {
            while let Some(Ok(_)) = socket.recv().await {}
        })
        .await;
    }

    /// Register the socket and relay payloads until it closes
    pub(crate) async fn serve(mut self, socket: WebSocket) {
        let (tx, mut rx) = mpsc::channel(self.config.client_queue_capacity);
        let handle = ClientHandle::new(self.state.id, tx).with_peer(self.state.peer_addr);
        let registration = self.registry.register_guarded(handle);
        self.state.open();
        self.stats.record_client_accepted();

        let (mut sink, mut stream) = socket.split();

        let reason = loop {
            tokio::select! {
                outbound = rx.recv() => match outbound {
                    Some(payload) => {
                        let send = sink.send(payload.into_message());
                        match tokio::time::timeout(self.config.send_timeout, send).await {
                            Ok(Ok(())) => self.state.on_sent(),
                            Ok(Err(e)) => break CloseReason::SendFailed(e.to_string()),
                            Err(_) => break CloseReason::SendFailed("send timed out".into()),
                        }
                    }
                    // The registry dropped our handle after a failed delivery.
                    None => break CloseReason::Evicted,
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                    Some(Ok(_)) => self.state.on_discarded(),
                    Some(Err(e)) => break CloseReason::ReceiveFailed(e.to_string()),
                },
            }
        };

        drop(registration);

        if matches!(reason, CloseReason::ClientClosed | CloseReason::Evicted) {
            let _ = sink.close().await;
        }

        tracing::info!(
            client_id = %self.state.id,
            peer = %self.state.peer_addr,
            reason = %reason,
            sent = self.state.messages_sent,
            discarded = self.state.frames_discarded,
            duration_ms = self.state.duration().as_millis() as u64,
            clients = self.registry.len(),
            "Client disconnected"
        );

        self.state.close(reason);
    }
}
