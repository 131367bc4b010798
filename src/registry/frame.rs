//! Relayed payload type
//!
//! A payload is one upstream frame carried through the registry untouched.
//! Both variants wrap reference-counted buffers, so cloning a payload for each
//! subscriber only bumps a refcount.
//!
//! Frames arrive as `tungstenite` messages from the feed client and leave as
//! `axum` messages on the downstream sockets. Text is converted once, on the
//! way in.

use axum::extract::ws::{Message, Utf8Bytes};
use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message as FeedMessage;

/// A frame received from the feed, forwarded verbatim to every subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame
    Text(Utf8Bytes),
    /// Binary frame
    Binary(Bytes),
}

impl Payload {
    /// Extract a relayable payload from a feed message.
    ///
    /// Control frames (ping, pong, close) carry no feed data and yield `None`.
    pub fn from_message(message: FeedMessage) -> Option<Self> {
        match message {
            FeedMessage::Text(text) => Utf8Bytes::try_from(Bytes::from(text))
                .ok()
                .map(Payload::Text),
            FeedMessage::Binary(data) => Some(Payload::Binary(data)),
            FeedMessage::Ping(_)
            | FeedMessage::Pong(_)
            | FeedMessage::Close(_)
            | FeedMessage::Frame(_) => None,
        }
    }

    /// Convert into a downstream message with the same frame kind
    pub fn into_message(self) -> Message {
        match self {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(data) => Message::Binary(data),
        }
    }

    /// Raw bytes of the payload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_str().as_bytes(),
            Payload::Binary(data) => data,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&'static str> for Payload {
    fn from(text: &'static str) -> Self {
        Payload::Text(Utf8Bytes::from_static(text))
    }
}
