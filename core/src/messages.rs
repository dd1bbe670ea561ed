//! Message shapes exchanged between execution contexts
//!
//! Contexts (page script, popup, panel, background worker) only share an
//! asynchronous message bus; these are the wire shapes that travel over
//! it. Field and tag names are part of the external interface and must
//! not change.

use crate::types::MediaItem;
use serde::{Deserialize, Serialize};

/// Name of the persistent live-update channel
pub const MEDIA_FEED_CHANNEL: &str = "media-feed";

/// Request/response scan queries answered by the page context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanRequest {
    /// Ask for the image candidate list only
    #[serde(rename = "GET_IMAGES")]
    GetImages,
    /// Ask for the merged image+video set
    #[serde(rename = "GET_MEDIA")]
    GetMedia,
}

/// Result-shaped reply to a [`ScanRequest`]
///
/// Failures travel as `{ok: false, error}` rather than crashing the
/// answering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanResponse {
    Images { ok: bool, images: Vec<MediaItem> },
    Media { ok: bool, media: Vec<MediaItem> },
    Error { ok: bool, error: String },
}

impl ScanResponse {
    pub fn images(images: Vec<MediaItem>) -> Self {
        ScanResponse::Images { ok: true, images }
    }

    pub fn media(media: Vec<MediaItem>) -> Self {
        ScanResponse::Media { ok: true, media }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ScanResponse::Error { ok: false, error: error.into() }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, ScanResponse::Error { .. })
    }
}

/// Payload delivered on the `media-feed` channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedMessage {
    /// One complete deduplicated snapshot
    #[serde(rename = "MEDIA_UPDATE")]
    MediaUpdate { media: Vec<MediaItem> },
}

/// Broadcasts fanned out to every live context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusMessage {
    /// A payment/entitlement transition was detected
    #[serde(rename = "LICENSE_CHANGED")]
    LicenseChanged { user: Option<serde_json::Value> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaItem;

    #[test]
    fn scan_request_uses_screaming_tags() {
        let json = serde_json::to_value(&ScanRequest::GetImages).unwrap();
        assert_eq!(json["type"], "GET_IMAGES");
        let json = serde_json::to_value(&ScanRequest::GetMedia).unwrap();
        assert_eq!(json["type"], "GET_MEDIA");
    }

    #[test]
    fn ok_response_carries_items() {
        let resp = ScanResponse::images(vec![MediaItem::image("https://x/y.png")]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["images"][0]["url"], "https://x/y.png");
        assert!(resp.is_ok());
    }

    #[test]
    fn error_response_is_result_shaped() {
        let resp = ScanResponse::error("no receiving end");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "no receiving end");
        assert!(!resp.is_ok());
    }

    #[test]
    fn feed_message_tag_matches_wire_shape() {
        let msg = FeedMessage::MediaUpdate { media: vec![] };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "MEDIA_UPDATE");
    }

    #[test]
    fn license_changed_tag_matches_wire_shape() {
        let msg = BusMessage::LicenseChanged { user: None };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "LICENSE_CHANGED");
    }
}
