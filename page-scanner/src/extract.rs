//! Candidate extraction
//!
//! Produces the raw, un-deduplicated candidate lists from a document
//! snapshot. Image candidates come from `img` sources, srcset
//! descriptors, the common lazy-load attributes, inline
//! background-image values and image preload links; video candidates
//! come from `video` sources, nested `source` elements and posters.
//!
//! Every raw string is resolved against the document base and filtered
//! through the scheme gate. Candidates that fail either step are
//! dropped without comment.

use crate::dedupe::unique_strings;
use crate::document::PageDocument;
use crate::urls::{is_accepted_scheme, resolve};
use page_media_core::{MediaItem, MediaKind};
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;
use tracing::trace;

/// Lazy-load attributes scanned on every `img` element
const LAZY_LOAD_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src", "data-url"];

/// Matches every `url(...)` token in a style value, quotes optional
static URL_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\((?:'|")?(.*?)(?:'|")?\)"#).expect("url token pattern"));

/// Stateless document scanner
///
/// Both scan methods are deterministic pure reads of the snapshot they
/// are handed; there is no caching between calls. Callers that need
/// debouncing layer it themselves (see [`crate::feed::MediaFeed`]).
pub struct MediaExtractor {
    img: Selector,
    styled: Selector,
    preload: Selector,
    video: Selector,
    source: Selector,
}

impl MediaExtractor {
    pub fn new() -> Self {
        Self {
            img: Selector::parse("img").expect("img selector"),
            styled: Selector::parse("[style]").expect("style selector"),
            preload: Selector::parse(r#"link[rel="preload"][as="image"]"#)
                .expect("preload selector"),
            video: Selector::parse("video").expect("video selector"),
            source: Selector::parse("source").expect("source selector"),
        }
    }

    /// Collect image candidates from the snapshot
    pub fn scan_images(&self, doc: &PageDocument) -> Vec<MediaItem> {
        let base = doc.base_uri();
        let mut found: Vec<String> = Vec::new();

        for img in doc.html().select(&self.img) {
            if let Some(src) = img.value().attr("src") {
                if !src.is_empty() {
                    found.push(resolve(src, base));
                }
            }
            for candidate in parse_srcset(img.value().attr("srcset").unwrap_or_default()) {
                found.push(resolve(&candidate, base));
            }
            for attr in LAZY_LOAD_ATTRS {
                if let Some(value) = img.value().attr(attr) {
                    if !value.is_empty() {
                        found.push(resolve(value, base));
                    }
                }
            }
        }

        for element in doc.html().select(&self.styled) {
            let style = element.value().attr("style").unwrap_or_default();
            for raw in background_image_urls(style) {
                found.push(resolve(&raw, base));
            }
        }

        for link in doc.html().select(&self.preload) {
            if let Some(href) = link.value().attr("href") {
                if !href.is_empty() {
                    found.push(resolve(href, base));
                }
            }
        }

        let items = normalize(found, MediaKind::Image);
        trace!(count = items.len(), "image scan complete");
        items
    }

    /// Collect video candidates from the snapshot
    ///
    /// Poster URLs are part of this list even though they point at still
    /// images; the merge tie-break therefore classifies them as video.
    pub fn scan_videos(&self, doc: &PageDocument) -> Vec<MediaItem> {
        let base = doc.base_uri();
        let mut found: Vec<String> = Vec::new();

        for video in doc.html().select(&self.video) {
            if let Some(src) = video.value().attr("src") {
                if !src.is_empty() {
                    found.push(resolve(src, base));
                }
            }
            for source in video.select(&self.source) {
                if let Some(src) = source.value().attr("src") {
                    if !src.is_empty() {
                        found.push(resolve(src, base));
                    }
                }
            }
            if let Some(poster) = video.value().attr("poster") {
                if !poster.is_empty() {
                    found.push(resolve(poster, base));
                }
            }
        }

        let items = normalize(found, MediaKind::Video);
        trace!(count = items.len(), "video scan complete");
        items
    }
}

impl Default for MediaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a srcset value into its candidate URLs
///
/// Comma-separated candidate descriptors; each descriptor's URL is the
/// substring before the first whitespace run. Empty segments are
/// discarded.
pub fn parse_srcset(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.split_whitespace().next())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract every `url(...)` token from background declarations in an
/// inline style value
///
/// A single declaration may yield multiple URLs (layered backgrounds).
/// Both the `background-image` longhand and the `background` shorthand
/// feed the computed background image, so both are scanned.
pub fn background_image_urls(style: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for declaration in style.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if !name.eq_ignore_ascii_case("background-image") && !name.eq_ignore_ascii_case("background")
        {
            continue;
        }
        if value.trim() == "none" {
            continue;
        }
        for capture in URL_TOKEN_RE.captures_iter(value) {
            let url = &capture[1];
            if !url.is_empty() {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

/// Dedup, filter and tag a raw candidate list
fn normalize(found: Vec<String>, kind: MediaKind) -> Vec<MediaItem> {
    unique_strings(found)
        .into_iter()
        .filter(|url| !url.is_empty() && is_accepted_scheme(url))
        .map(|url| MediaItem { url, kind })
        .collect()
}
