//! Broadcast registry implementation
//!
//! The single shared set of live downstream connections. The feed connector
//! broadcasts into it; each connection task registers itself on open and is
//! removed on close or on a failed delivery.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::entry::{ClientHandle, ClientId, DeliveryFailure};
use super::frame::Payload;

/// Result of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Clients the payload was queued for
    pub delivered: usize,
    /// Clients removed because delivery failed
    pub evicted: usize,
}

/// Concurrency-safe set of downstream connections
///
/// Broadcast only holds the read lock while enqueuing into per-client queues,
/// which never blocks, so registration and removal from connection tasks wait
/// at most one fan-out pass.
pub struct BroadcastRegistry {
    clients: RwLock<HashMap<ClientId, ClientHandle>>,
}

impl BroadcastRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Add a client to the live set.
    ///
    /// Keyed by client id: registering the same id again replaces the entry
    /// rather than adding a second one. Returns `true` if the id was new.
    pub fn register(&self, handle: ClientHandle) -> bool {
        let id = handle.id;
        let peer = handle.peer_addr;
        let mut clients = self.clients.write();
        let is_new = clients.insert(id, handle).is_none();

        tracing::info!(
            client_id = %id,
            peer = ?peer,
            clients = clients.len(),
            "Client registered"
        );

        is_new
    }

    /// Register a client and return a guard that unregisters it on drop
    pub fn register_guarded(self: &Arc<Self>, handle: ClientHandle) -> Registration {
        let id = handle.id;
        self.register(handle);
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Remove a client if present.
    ///
    /// Redundant calls (disconnect path racing a failed broadcast) are no-ops.
    /// Returns `true` if the client was removed by this call.
    pub fn unregister(&self, id: ClientId) -> bool {
        let mut clients = self.clients.write();
        let removed = clients.remove(&id).is_some();

        if removed {
            tracing::info!(
                client_id = %id,
                clients = clients.len(),
                "Client unregistered"
            );
        }

        removed
    }

    /// Deliver a payload to every registered client.
    ///
    /// Clients whose delivery fails are unregistered. Failures are logged and
    /// counted in the outcome, never returned to the caller.
    pub fn broadcast(&self, payload: &Payload) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let mut failed: Vec<(ClientId, DeliveryFailure)> = Vec::new();

        {
            let clients = self.clients.read();
            for (id, handle) in clients.iter() {
                match handle.deliver(payload.clone()) {
                    Ok(()) => outcome.delivered += 1,
                    Err(failure) => failed.push((*id, failure)),
                }
            }
        }

        for (id, failure) in failed {
            if self.unregister(id) {
                outcome.evicted += 1;
                tracing::warn!(client_id = %id, reason = %failure, "Client evicted");
            }
        }

        outcome
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Whether no clients are registered
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Whether a client is registered
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.read().contains_key(&id)
    }
}

impl Default for BroadcastRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a client registered for as long as it is alive
///
/// Dropping the guard unregisters the client, whichever way the owning
/// connection task exits.
#[must_use = "dropping the registration unregisters the client immediately"]
pub struct Registration {
    registry: Arc<BroadcastRegistry>,
    id: ClientId,
}

impl Registration {
    /// Id of the registered client
    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
