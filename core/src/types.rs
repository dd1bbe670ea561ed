//! Shared data model for the page-media workspace
//!
//! These types cross crate boundaries: the scanner produces `MediaItem`
//! sets, the entitlement layer works with usage records and activation
//! state, and the integration layer carries both over the message bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a discovered media resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image (img src, srcset, lazy-load attributes, backgrounds, preloads)
    Image,
    /// Video (video src, nested sources, posters)
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One downloadable media resource discovered on a page
///
/// Identity is the `url` string. Items are recomputed on every scan; a
/// snapshot never outlives the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Absolute URL (http, https, data or blob scheme)
    pub url: String,
    /// Classification assigned by the scan that produced the item
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn image(url: impl Into<String>) -> Self {
        Self { url: url.into(), kind: MediaKind::Image }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self { url: url.into(), kind: MediaKind::Video }
    }
}

/// Daily free-usage counter as persisted
///
/// `count` is only meaningful for the stored `date`; readers treat a
/// record from another day as `{today, 0}` without rewriting storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Local calendar day, zero-padded `YYYY-MM-DD`
    pub date: String,
    /// Number of charged downloads on that day
    pub count: u32,
}

/// Why an entitlement check degraded to unpaid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// No payment backend was configured at construction time
    NotConfigured,
    /// The remote call itself failed
    CallFailed(String),
    /// The remote answered with an empty payload
    EmptyResult,
}

/// Result of one remote entitlement check
///
/// Never constructed from an error path: failed checks produce
/// `paid: false` plus a diagnostic instead of propagating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Whether the user holds an active purchase/subscription
    pub paid: bool,
    /// Degradation marker when the check could not complete normally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
    /// Opaque user payload as returned by the remote, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

impl UserStatus {
    /// Unpaid status carrying a degradation marker
    pub fn unpaid(diagnostic: Diagnostic) -> Self {
        Self { paid: false, diagnostic: Some(diagnostic), user: None }
    }
}

/// Live view over the entitlement state, derived per call
///
/// The locally persisted shadow copy (`licensePaid`/`licenseUpdatedAt`)
/// is a cache hint for contexts without a live backend connection; it is
/// never the source of truth for gating decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationInfo {
    /// Whether downloads are currently unmetered
    pub active: bool,
    /// Expiry of the entitlement when the remote reports one
    pub expires_at: Option<DateTime<Utc>>,
    /// Opaque user payload backing this view
    pub user: Option<serde_json::Value>,
}

impl ActivationInfo {
    /// The inactive default used whenever no entitlement data is available
    pub fn inactive() -> Self {
        Self { active: false, expires_at: None, user: None }
    }
}

/// Output format requested for a download batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// Keep the source bytes untouched
    Original,
    /// Transcode images to JPEG at the given quality (0.0 - 1.0);
    /// videos always download as original regardless
    Jpeg { quality: f32 },
}

/// How the download collaborator resolves filename collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Append a counter to make the name unique
    Uniquify,
    /// Replace the existing file
    Overwrite,
}

/// One download handed to the file-download collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Source URL to fetch
    pub source: String,
    /// Filename suggestion, already sanitized
    pub suggested_filename: String,
    /// Collision handling
    pub conflict_policy: ConflictPolicy,
    /// Whether the item should be transcoded to JPEG before saving
    pub transcode_to_jpeg: bool,
}
