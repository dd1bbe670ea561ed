//! URL resolution and scheme filtering
//!
//! Every raw candidate string extracted from markup or style passes
//! through [`resolve`] and then [`is_accepted_scheme`] before it becomes
//! a media item. Rejected candidates are dropped silently; absence is
//! expected, not exceptional.

use url::Url;

/// Schemes a candidate may carry after resolution
const ACCEPTED_SCHEMES: &[&str] = &["http", "https", "data", "blob"];

/// Resolve a candidate against the document base URI
///
/// Falls back to the candidate unchanged when resolution fails, which
/// covers `data:` and `blob:` URIs that must pass through verbatim as
/// well as malformed strings the scheme filter will reject later.
pub fn resolve(candidate: &str, base_uri: &str) -> String {
    if let Ok(base) = Url::parse(base_uri) {
        if let Ok(joined) = base.join(candidate) {
            return joined.to_string();
        }
    }
    // Absolute candidates still resolve without a usable base.
    if let Ok(absolute) = Url::parse(candidate) {
        return absolute.to_string();
    }
    candidate.to_string()
}

/// Whether a URL's scheme, case-insensitively, is one we download from
pub fn is_accepted_scheme(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };
    let scheme = &url[..colon];
    ACCEPTED_SCHEMES
        .iter()
        .any(|accepted| scheme.eq_ignore_ascii_case(accepted))
}
