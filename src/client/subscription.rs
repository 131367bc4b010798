//! Feed subscription request
//!
//! The first and only frame the relay sends upstream. Serializes to the
//! field names the feed expects:
//!
//! ```json
//! {"APIKey":"...","BoundingBoxes":[[[-90.0,-180.0],[90.0,180.0]]],"FilterMessageTypes":["PositionReport"]}
//! ```

use serde::Serialize;

use crate::error::Result;

/// Geographic filter: two `[latitude, longitude]` corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox(pub [f64; 2], pub [f64; 2]);

impl BoundingBox {
    /// The whole globe
    pub const WORLD: BoundingBox = BoundingBox([-90.0, -180.0], [90.0, 180.0]);

    /// Create a box from two opposite corners
    pub fn new(corner: [f64; 2], opposite: [f64; 2]) -> Self {
        Self(corner, opposite)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::WORLD
    }
}

/// Subscription sent once per upstream connection
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriptionRequest {
    #[serde(rename = "APIKey")]
    api_key: String,
    bounding_boxes: Vec<BoundingBox>,
    filter_message_types: Vec<String>,
}

impl SubscriptionRequest {
    pub fn new(
        api_key: impl Into<String>,
        bounding_boxes: Vec<BoundingBox>,
        filter_message_types: Vec<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            bounding_boxes,
            filter_message_types,
        }
    }

    pub fn bounding_boxes(&self) -> &[BoundingBox] {
        &self.bounding_boxes
    }

    pub fn filter_message_types(&self) -> &[String] {
        &self.filter_message_types
    }

    /// Encode as the JSON text frame sent upstream
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Debug for SubscriptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRequest")
            .field("api_key", &"<redacted>")
            .field("bounding_boxes", &self.bounding_boxes)
            .field("filter_message_types", &self.filter_message_types)
            .finish()
    }
}
