//! Broadcast registry for fan-out to downstream clients
//!
//! The registry is the only state shared between the feed connector and the
//! downstream listener. Each client owns a bounded delivery queue; the registry
//! holds the sending halves and pushes every payload into each of them.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<BroadcastRegistry>
//!                   ┌──────────────────────────┐
//!                   │ clients: HashMap<        │
//!                   │   ClientId,              │
//!                   │   ClientHandle { tx }    │
//!                   │ >                        │
//!                   └────────────┬─────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!  [FeedConnector]          [Connection]            [Connection]
//!  broadcast(payload)       rx.recv()               rx.recv()
//!        │                       │                       │
//!        └──► try_send() ───────►└─► ws.send() ──► TCP   └─► ...
//! ```
//!
//! # Zero-Copy Design
//!
//! `Payload` wraps `bytes::Bytes`, so every client queue holds a refcounted
//! view of the same upstream frame.

pub mod entry;
pub mod frame;
pub mod store;

pub use entry::{ClientHandle, ClientId, DeliveryFailure};
pub use frame::Payload;
pub use store::{BroadcastOutcome, BroadcastRegistry, Registration};
