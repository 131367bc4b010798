//! Downstream session state machine
//!
//! Tracks one downstream connection from upgrade request to close:
//! `Connecting → Open → Closed`, or `Connecting → Closed` when the request is
//! rejected before registration.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::ClientId;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Upgrade requested, not yet registered
    Connecting,
    /// Registered and receiving relayed payloads
    Open,
    /// Session ended
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Requested path was not the relay path
    Rejected { path: String },
    /// Client sent a close frame or the stream ended
    ClientClosed,
    /// Reading from the client failed
    ReceiveFailed(String),
    /// Writing to the client failed
    SendFailed(String),
    /// Removed from the registry after a failed delivery
    Evicted,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Rejected { path } => write!(f, "rejected path {}", path),
            CloseReason::ClientClosed => write!(f, "closed by client"),
            CloseReason::ReceiveFailed(e) => write!(f, "receive failed: {}", e),
            CloseReason::SendFailed(e) => write!(f, "send failed: {}", e),
            CloseReason::Evicted => write!(f, "evicted from registry"),
        }
    }
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Client id used as the registry key
    pub id: ClientId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// TCP accept time
    pub connected_at: Instant,

    /// Time the session reached `Open`
    pub opened_at: Option<Instant>,

    /// Payloads written to the client
    pub messages_sent: u64,

    /// Client frames read and discarded
    pub frames_discarded: u64,

    /// Set once the session is closed
    pub close_reason: Option<CloseReason>,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: ClientId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
            opened_at: None,
            messages_sent: 0,
            frames_discarded: 0,
            close_reason: None,
        }
    }

    /// Transition to `Open` after the path check passed
    pub fn open(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Open;
            self.opened_at = Some(Instant::now());
        }
    }

    /// Transition to `Closed`; the first recorded reason wins
    pub fn close(&mut self, reason: CloseReason) {
        if self.phase != SessionPhase::Closed {
            self.phase = SessionPhase::Closed;
            self.close_reason = Some(reason);
        }
    }

    /// Count a payload written to the client
    pub fn on_sent(&mut self) {
        self.messages_sent += 1;
    }

    /// Count a client frame that was ignored
    pub fn on_discarded(&mut self) {
        self.frames_discarded += 1;
    }

    /// Whether the session is open
    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
