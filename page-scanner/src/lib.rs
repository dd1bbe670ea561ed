//! Media discovery pipeline
//!
//! Scans parsed HTML documents for downloadable image and video
//! candidates, normalizes and deduplicates them, and streams fresh
//! snapshots to subscribers when the document changes.

pub mod urls;
pub mod document;
pub mod extract;
pub mod dedupe;
pub mod feed;
pub mod service;

pub use urls::{is_accepted_scheme, resolve};
pub use document::{DocumentStore, PageDocument};
pub use extract::MediaExtractor;
pub use dedupe::{merge, unique_strings};
pub use feed::{DomMutation, MediaFeed, MediaFeedConfig, MediaSource};
pub use service::ScanService;
