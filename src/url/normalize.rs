use crate::url::domain::extract_host;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path};
use url::Url;

/// Base subdirectory every same-origin page and asset is stored under
pub const BASE_DIR: &str = "_";

/// Subdirectory holding assets fetched from other origins
pub const FOREIGN_DIR: &str = "_ext";

/// File name used for directory-style paths (`/` and `/docs/`)
pub const INDEX_FILE: &str = "index.html";

/// Replacement for empty or neutralized path segments
const PLACEHOLDER: &str = "_";

/// Longest segment most filesystems accept, in bytes
const MAX_SEGMENT_BYTES: usize = 255;

/// Device names Windows refuses as file names, with or without extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Maps a URL to the relative path its resource is stored at inside a snapshot
///
/// # Normalization Steps
///
/// 1. Take the URL path (query and fragment are ignored)
/// 2. An empty path or a path ending in `/` gets `index.html` appended
/// 3. Every segment is percent-decoded and sanitized on its own:
///    - characters illegal on common filesystems become `_`
///    - `.`, `..` and empty segments become `_`
///    - trailing dots and spaces are trimmed
///    - reserved device names get a `_` suffix
/// 4. The result is rooted under the `_` base directory, so it can never
///    collide with the snapshot's own landing `index.html`
///
/// The function is pure: the same URL always yields the same path.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wayback_lite::url::normalize_path_for_disk;
///
/// let url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(normalize_path_for_disk(&url), "_/index.html");
///
/// let url = Url::parse("https://example.com/img/a.png?v=2").unwrap();
/// assert_eq!(normalize_path_for_disk(&url), "_/img/a.png");
/// ```
pub fn normalize_path_for_disk(url: &Url) -> String {
    let mut parts = vec![BASE_DIR.to_string()];
    parts.extend(disk_segments(url));
    parts.join("/")
}

/// Maps an off-origin asset URL to its relative path inside a snapshot
///
/// Foreign assets live under `_ext/<host>/` so a CDN's `/app.js` never
/// overwrites the site's own `/app.js`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wayback_lite::url::foreign_asset_path;
///
/// let url = Url::parse("https://cdn.example.net/lib/app.js").unwrap();
/// assert_eq!(foreign_asset_path(&url), "_ext/cdn.example.net/lib/app.js");
/// ```
pub fn foreign_asset_path(url: &Url) -> String {
    let host = extract_host(url).unwrap_or_default();
    let mut parts = vec![FOREIGN_DIR.to_string(), sanitize_segment(&host)];
    parts.extend(disk_segments(url));
    parts.join("/")
}

/// Returns the URL with its fragment removed
///
/// Two references that differ only by `#fragment` name the same resource, so
/// the crawler keys its visited set on this form.
pub fn canonicalize(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Returns true if `path` is relative and contains only plain components
///
/// Such a path, joined onto a directory, always resolves to a strict
/// descendant of that directory.
pub fn is_safe_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

/// Splits the URL path into sanitized segments, appending the index file for
/// directory-style paths
fn disk_segments(url: &Url) -> Vec<String> {
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);

    let mut segments: Vec<&str> = path.split('/').collect();
    match segments.last() {
        Some(last) if !last.is_empty() => {}
        _ => {
            segments.pop();
            segments.push(INDEX_FILE);
        }
    }

    segments.into_iter().map(sanitize_segment).collect()
}

/// Sanitizes a single path segment so it is a valid, non-special file name
fn sanitize_segment(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();

    let replaced: String = decoded
        .chars()
        .map(|c| if is_illegal_char(c) { '_' } else { c })
        .collect();

    // Trailing dots and spaces are stripped by Windows and make `.`/`..` vanish
    let trimmed = replaced.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        return PLACEHOLDER.to_string();
    }

    let mut segment = trimmed.to_string();
    if is_reserved_name(&segment) {
        segment.push('_');
    }

    truncate_to_boundary(segment, MAX_SEGMENT_BYTES)
}

fn is_illegal_char(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' | '#')
}

fn is_reserved_name(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment);
    RESERVED_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
}

fn truncate_to_boundary(mut segment: String, max_bytes: usize) -> String {
    if segment.len() <= max_bytes {
        return segment;
    }
    let mut cut = max_bytes;
    while !segment.is_char_boundary(cut) {
        cut -= 1;
    }
    segment.truncate(cut);
    segment
}
