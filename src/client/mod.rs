//! Upstream feed client
//!
//! Connects to the position-report feed, sends the subscription request, and
//! pushes every received frame into the broadcast registry. Reconnects with a
//! fixed delay for as long as the process runs.

pub mod config;
pub mod connector;
pub mod subscription;

pub use config::FeedConfig;
pub use connector::{FeedConnector, FeedPhase};
pub use subscription::{BoundingBox, SubscriptionRequest};
