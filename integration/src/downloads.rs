//! Download planning
//!
//! Turns a selection of media items into requests for the
//! file-download collaborator: derives a filename from each URL,
//! rewrites the extension when an image is to be transcoded to JPEG,
//! and consults the usage gate before and after every item. The
//! collaborator does the actual fetching and (for JPEG) the pixel
//! work; none of that happens here.

use async_trait::async_trait;
use entitlements::UsageGate;
use page_media_core::{
    ConflictPolicy, DownloadError, DownloadFormat, DownloadRequest, MediaItem, MediaKind,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fallback when a URL yields no usable path segment
const DEFAULT_FILENAME: &str = "image";

/// File-download capability of the hosting environment
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError>;
}

/// Result of one download batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Items the collaborator accepted
    pub completed: usize,
    /// Items that were selected
    pub total: usize,
    /// Whether the batch stopped early on an exhausted quota
    pub quota_exhausted: bool,
}

/// Filename suggestion from a URL: the last non-empty path segment,
/// percent-decoded
pub fn filename_from_url(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => return DEFAULT_FILENAME.to_string(),
    };
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(percent_decode)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Replace the extension after the final dot; a name without one (or a
/// leading-dot name) gets the extension appended
pub fn change_ext(name: &str, ext: &str) -> String {
    let base = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    format!("{}.{}", base, ext.trim_start_matches('.'))
}

/// Replace runs of characters unsafe in filenames with one underscore
pub fn sanitize_filename(name: &str) -> String {
    const UNSAFE: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if UNSAFE.contains(&c) {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let mut out = Vec::new();
    let mut bytes = input.as_bytes().iter().cloned();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let high = bytes.next().and_then(hex_digit);
            let low = bytes.next().and_then(hex_digit);
            match (high, low) {
                (Some(h), Some(l)) => out.push(h << 4 | l),
                _ => {
                    out.push(b'%');
                    if let Some(x) = high {
                        out.push(x);
                    }
                    if let Some(x) = low {
                        out.push(x);
                    }
                }
            }
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Gated batch executor in front of the download collaborator
pub struct DownloadPlanner {
    gate: Arc<UsageGate>,
    downloader: Arc<dyn Downloader>,
}

impl DownloadPlanner {
    pub fn new(gate: Arc<UsageGate>, downloader: Arc<dyn Downloader>) -> Self {
        Self { gate, downloader }
    }

    /// Build the request for one item under the selected format
    ///
    /// Only images get the JPEG rewrite; videos keep their original
    /// name and bytes whatever format the caller selected.
    pub fn plan_request(item: &MediaItem, format: DownloadFormat) -> DownloadRequest {
        let transcode =
            matches!(format, DownloadFormat::Jpeg { .. }) && item.kind == MediaKind::Image;
        let name = filename_from_url(&item.url);
        let suggested = if transcode {
            sanitize_filename(&change_ext(&name, "jpg"))
        } else {
            sanitize_filename(&name)
        };
        DownloadRequest {
            source: item.url.clone(),
            suggested_filename: suggested,
            conflict_policy: ConflictPolicy::Uniquify,
            transcode_to_jpeg: transcode,
        }
    }

    /// Download a selection, charging quota per successful image
    ///
    /// The gate is consulted before each item; an exhausted quota stops
    /// the whole batch. Individual download failures are logged and the
    /// batch continues. Quota is charged only after the collaborator
    /// accepted the item.
    pub async fn download_selected(
        &self,
        items: &[MediaItem],
        format: DownloadFormat,
    ) -> DownloadOutcome {
        let mut completed = 0;
        let mut quota_exhausted = false;
        info!(total = items.len(), "starting download batch");

        for item in items {
            let decision = self.gate.check(item.kind).await;
            if !decision.permitted {
                quota_exhausted = true;
                break;
            }

            let request = Self::plan_request(item, format);
            match self.downloader.download(&request).await {
                Ok(()) => {
                    completed += 1;
                    let remaining = self.gate.settle(item.kind).await;
                    debug!(url = %item.url, remaining, "download accepted");
                }
                Err(err) => {
                    warn!(url = %item.url, %err, "download failed");
                }
            }
        }

        info!(completed, total = items.len(), "download batch finished");
        DownloadOutcome { completed, total: items.len(), quota_exhausted }
    }
}
