//! Relay-wide counters
//!
//! Updated with relaxed atomics from the feed connector and connection tasks;
//! read as a snapshot by the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters shared by all relay tasks
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    messages_relayed: AtomicU64,
    bytes_relayed: AtomicU64,
    upstream_connects: AtomicU64,
    upstream_failures: AtomicU64,
    clients_accepted: AtomicU64,
    clients_rejected: AtomicU64,
    clients_evicted: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Seconds since the relay started
    pub uptime_secs: u64,
    /// Upstream messages fanned out
    pub messages_relayed: u64,
    /// Upstream payload bytes fanned out (counted once per message)
    pub bytes_relayed: u64,
    /// Successful upstream subscriptions
    pub upstream_connects: u64,
    /// Upstream connection attempts that ended in an error
    pub upstream_failures: u64,
    /// Downstream clients that reached the open state
    pub clients_accepted: u64,
    /// Downstream connections refused for a wrong path
    pub clients_rejected: u64,
    /// Downstream clients dropped after a failed delivery
    pub clients_evicted: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            messages_relayed: AtomicU64::new(0),
            bytes_relayed: AtomicU64::new(0),
            upstream_connects: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            clients_accepted: AtomicU64::new(0),
            clients_rejected: AtomicU64::new(0),
            clients_evicted: AtomicU64::new(0),
        }
    }

    /// Record one relayed upstream message
    pub fn record_relayed(&self, bytes: usize, evicted: usize) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.bytes_relayed.fetch_add(bytes as u64, Ordering::Relaxed);
        if evicted > 0 {
            self.clients_evicted
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    pub fn record_upstream_connect(&self) {
        self.upstream_connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_client_accepted(&self) {
        self.clients_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_client_rejected(&self) {
        self.clients_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the relay started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            bytes_relayed: self.bytes_relayed.load(Ordering::Relaxed),
            upstream_connects: self.upstream_connects.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            clients_accepted: self.clients_accepted.load(Ordering::Relaxed),
            clients_rejected: self.clients_rejected.load(Ordering::Relaxed),
            clients_evicted: self.clients_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}
