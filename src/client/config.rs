//! Feed connector configuration

use std::time::Duration;

use crate::error::{Error, Result};

use super::subscription::{BoundingBox, SubscriptionRequest};

/// Upstream feed endpoint
pub const DEFAULT_FEED_URL: &str = "wss://stream.aisstream.io/v0/stream";

/// Message types requested when none are configured
pub const DEFAULT_MESSAGE_TYPES: [&str; 5] = [
    "PositionReport",
    "ShipStaticData",
    "StaticDataReport",
    "ExtendedClassBPositionReport",
    "StandardClassBPositionReport",
];

/// Fixed wait between upstream connection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Feed connector configuration options
#[derive(Clone)]
pub struct FeedConfig {
    /// WebSocket URL of the feed (`wss://` or `ws://`)
    pub url: String,

    /// Geographic filter sent in the subscription
    pub bounding_boxes: Vec<BoundingBox>,

    /// Message-type filter sent in the subscription
    pub message_types: Vec<String>,

    /// Wait between a failed attempt and the next one
    pub reconnect_delay: Duration,

    /// Connect and handshake must complete within this time
    pub connect_timeout: Duration,

    api_key: String,
}

impl FeedConfig {
    /// Create a config with the default endpoint and filters.
    ///
    /// Fails if the API key is empty or whitespace.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::Config("feed API key is empty".into()));
        }

        Ok(Self {
            url: DEFAULT_FEED_URL.to_string(),
            bounding_boxes: vec![BoundingBox::WORLD],
            message_types: DEFAULT_MESSAGE_TYPES.iter().map(|t| t.to_string()).collect(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: Duration::from_secs(10),
            api_key,
        })
    }

    /// Set the feed URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the geographic filter
    pub fn bounding_boxes(mut self, boxes: Vec<BoundingBox>) -> Self {
        self.bounding_boxes = boxes;
        self
    }

    /// Replace the message-type filter; an empty list keeps the defaults
    pub fn message_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: Vec<String> = types.into_iter().map(Into::into).collect();
        if !types.is_empty() {
            self.message_types = types;
        }
        self
    }

    /// Set reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the subscription for a new connection
    pub fn subscription_request(&self) -> SubscriptionRequest {
        SubscriptionRequest::new(
            self.api_key.clone(),
            self.bounding_boxes.clone(),
            self.message_types.clone(),
        )
    }
}

impl std::fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("bounding_boxes", &self.bounding_boxes)
            .field("message_types", &self.message_types)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
