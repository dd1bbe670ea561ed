//! Document snapshots
//!
//! Scans operate on parsed snapshots, not a live DOM: the hosting page
//! hands over markup, the store keeps the latest copy, and every scan
//! re-parses and re-walks it from scratch. Parsed trees are not kept
//! around because the parser output is not thread-safe; the source text
//! is, and parsing is cheap relative to a scan.

use page_media_core::{ScanError, Uuid};
use scraper::Html;
use std::sync::RwLock;
use tracing::debug;

/// One parsed document plus the base URI scans resolve against
pub struct PageDocument {
    html: Html,
    base_uri: String,
}

impl PageDocument {
    /// Parse markup into a scannable snapshot
    pub fn parse(markup: &str, base_uri: impl Into<String>) -> Self {
        Self {
            html: Html::parse_document(markup),
            base_uri: base_uri.into(),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }
}

/// Source of truth for the current document markup
///
/// Shared between the scan service (request/response reads) and the
/// media feed (recompute on change). Interior locking is synchronous:
/// loading and snapshotting never suspend.
pub struct DocumentStore {
    state: RwLock<Option<Source>>,
}

struct Source {
    markup: String,
    base_uri: String,
    revision: Uuid,
}

impl DocumentStore {
    /// Create an empty store; scans fail with `DocumentNotLoaded` until
    /// the first [`load`](Self::load)
    pub fn new() -> Self {
        Self { state: RwLock::new(None) }
    }

    /// Replace the current document
    pub fn load(&self, markup: impl Into<String>, base_uri: impl Into<String>) {
        let source = Source {
            markup: markup.into(),
            base_uri: base_uri.into(),
            revision: Uuid::new_v4(),
        };
        debug!(base_uri = %source.base_uri, revision = %source.revision, "document loaded");
        *self.state.write().expect("document lock poisoned") = Some(source);
    }

    /// Parse the current markup into a fresh snapshot
    pub fn snapshot(&self) -> Result<PageDocument, ScanError> {
        let guard = self.state.read().expect("document lock poisoned");
        match guard.as_ref() {
            Some(source) => Ok(PageDocument::parse(&source.markup, source.base_uri.clone())),
            None => Err(ScanError::DocumentNotLoaded),
        }
    }

    /// Whether a document has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.state.read().expect("document lock poisoned").is_some()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_reports_not_loaded() {
        let store = DocumentStore::new();
        assert!(!store.is_loaded());
        assert!(matches!(store.snapshot(), Err(ScanError::DocumentNotLoaded)));
    }

    #[test]
    fn load_then_snapshot_round_trips_base_uri() {
        let store = DocumentStore::new();
        store.load("<html><body></body></html>", "https://example.com/page");
        let doc = store.snapshot().unwrap();
        assert_eq!(doc.base_uri(), "https://example.com/page");
    }

    #[test]
    fn reload_replaces_previous_document() {
        let store = DocumentStore::new();
        store.load("<p>first</p>", "https://a.example/");
        store.load("<p>second</p>", "https://b.example/");
        let doc = store.snapshot().unwrap();
        assert_eq!(doc.base_uri(), "https://b.example/");
    }
}
