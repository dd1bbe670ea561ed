//! Scan message service
//!
//! Answers the request/response queries a consumer context sends to the
//! page context. Failures travel back result-shaped; nothing here ever
//! crosses the boundary as a panic or a bare error.

use crate::dedupe::merge;
use crate::document::DocumentStore;
use crate::extract::MediaExtractor;
use crate::feed::MediaSource;
use page_media_core::{MediaItem, ScanError, ScanRequest, ScanResponse};
use std::sync::Arc;
use tracing::{debug, warn};

/// Request handler over the current document
pub struct ScanService {
    store: Arc<DocumentStore>,
    extractor: MediaExtractor,
}

impl ScanService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            extractor: MediaExtractor::new(),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Image candidates from the current document
    pub fn collect_images(&self) -> Result<Vec<MediaItem>, ScanError> {
        let doc = self.store.snapshot()?;
        Ok(self.extractor.scan_images(&doc))
    }

    /// Merged image+video snapshot from the current document
    pub fn collect_media(&self) -> Result<Vec<MediaItem>, ScanError> {
        let doc = self.store.snapshot()?;
        let images = self.extractor.scan_images(&doc);
        let videos = self.extractor.scan_videos(&doc);
        Ok(merge(images, videos))
    }

    /// Answer one scan request, result-shaped either way
    pub fn handle(&self, request: &ScanRequest) -> ScanResponse {
        let response = match request {
            ScanRequest::GetImages => self.collect_images().map(ScanResponse::images),
            ScanRequest::GetMedia => self.collect_media().map(ScanResponse::media),
        };
        match response {
            Ok(ok) => ok,
            Err(err) => {
                warn!(%err, "scan request failed");
                ScanResponse::error(err.to_string())
            }
        }
    }
}

/// The feed republishes whatever the service can currently collect; an
/// unloaded document yields an empty snapshot rather than an error.
impl MediaSource for ScanService {
    fn collect(&self) -> Vec<MediaItem> {
        match self.collect_media() {
            Ok(media) => media,
            Err(err) => {
                debug!(%err, "collect fell back to empty snapshot");
                Vec::new()
            }
        }
    }
}
