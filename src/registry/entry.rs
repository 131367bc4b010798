//! Client registration types
//!
//! A `ClientHandle` is the registry's view of one downstream connection: an
//! identity plus the sending half of that connection's delivery queue. The
//! connection task owns the receiving half and writes to the socket.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::frame::Payload;

/// Process-unique identifier of a downstream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Why a payload could not be queued for a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The client's queue is full; it is not keeping up with the feed
    QueueFull,
    /// The connection task is gone
    Closed,
}

impl std::fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryFailure::QueueFull => write!(f, "delivery queue full"),
            DeliveryFailure::Closed => write!(f, "connection closed"),
        }
    }
}

/// Registry entry for a single downstream connection
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Connection identity; the registry is keyed by it
    pub id: ClientId,

    /// Remote peer address, if known
    pub peer_addr: Option<SocketAddr>,

    tx: mpsc::Sender<Payload>,
}

impl ClientHandle {
    /// Create a handle around the sending half of a delivery queue
    pub fn new(id: ClientId, tx: mpsc::Sender<Payload>) -> Self {
        Self {
            id,
            peer_addr: None,
            tx,
        }
    }

    /// Attach the peer address (used for log fields)
    pub fn with_peer(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Queue a payload without waiting.
    ///
    /// Never blocks: a full queue is reported as a failure so the caller can
    /// move on to the next client.
    pub fn deliver(&self, payload: Payload) -> Result<(), DeliveryFailure> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::QueueFull,
            TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }

    /// Whether the connection side has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
