//! Candidate de-duplication and merge
//!
//! One record per distinct URL. Images are inserted first and videos
//! second, so a URL claimed by both scans keeps its first insertion
//! position but ends up classified as video.

use page_media_core::MediaItem;
use std::collections::HashMap;

/// Order-preserving de-duplication by first occurrence
///
/// Idempotent; applied before resolution to avoid redundant work, not
/// for correctness (resolution is itself idempotent).
pub fn unique_strings(list: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, ()> = HashMap::with_capacity(list.len());
    let mut out = Vec::with_capacity(list.len());
    for value in list {
        if seen.insert(value.clone(), ()).is_none() {
            out.push(value);
        }
    }
    out
}

/// Merge image and video candidate lists into one snapshot
///
/// Later insertions for the same URL overwrite earlier ones in place,
/// so a duplicate keeps its original position with the video kind.
pub fn merge(images: Vec<MediaItem>, videos: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<MediaItem> = Vec::with_capacity(images.len() + videos.len());
    for item in images.into_iter().chain(videos) {
        match index.get(&item.url) {
            Some(&position) => out[position] = item,
            None => {
                index.insert(item.url.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}
