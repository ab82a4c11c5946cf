//! URL handling module for Wayback-Lite
//!
//! This module provides the pure URL functions the rest of the crate builds on:
//! - Host extraction and same-origin tests
//! - Fetchability and static-asset classification
//! - Mapping URLs to safe relative paths inside a snapshot

mod classify;
mod domain;
mod normalize;

// Re-export main functions
pub use classify::{
    classify_link, is_asset, is_css_content_type, is_fetchable, is_html_content_type, LinkClass,
};
pub use domain::{extract_host, same_origin};
pub use normalize::{
    canonicalize, foreign_asset_path, is_safe_relative, normalize_path_for_disk, BASE_DIR,
    FOREIGN_DIR, INDEX_FILE,
};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a seed URL and checks it is an absolute http(s) URL with a host
///
/// # Examples
///
/// ```
/// use wayback_lite::url::parse_seed;
///
/// assert!(parse_seed("https://example.com/").is_ok());
/// assert!(parse_seed("ftp://example.com/").is_err());
/// assert!(parse_seed("not a url").is_err());
/// ```
pub fn parse_seed(input: &str) -> UrlResult<Url> {
    let url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !is_fetchable(&url) {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(canonicalize(&url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_strips_fragment() {
        let url = parse_seed("https://example.com/docs#intro").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs");
    }

    #[test]
    fn test_parse_seed_trims_whitespace() {
        let url = parse_seed("  https://example.com/  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_seed_rejects_scheme() {
        assert!(matches!(
            parse_seed("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_parse_seed_rejects_garbage() {
        assert!(matches!(parse_seed("example"), Err(UrlError::Parse(_))));
    }
}
