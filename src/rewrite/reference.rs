use crate::url::{is_fetchable, normalize_path_for_disk, same_origin};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

/// Bytes escaped when a snapshot path is emitted as a URL reference
///
/// Covers characters that would end an unquoted CSS `url()`, split a
/// `srcset` candidate, or start a query or fragment.
const LOCAL_PATH_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'#')
    .add(b'%')
    .add(b'(')
    .add(b')')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Rewrites a single reference so it points inside the snapshot
///
/// # Rewrite Rules
///
/// | Reference | Result |
/// |-----------|--------|
/// | empty or `#fragment` | unchanged |
/// | already under `prefix` | unchanged |
/// | not http(s) after resolution (`data:`, `mailto:`, ...) | unchanged |
/// | another origin | unchanged (stays absolute) |
/// | same origin as `base_url` | `prefix` + normalized path (+ `#fragment`) |
///
/// An empty `prefix` disables rewriting. Because the output of a rewrite is
/// always under `prefix`, applying the function to its own output is a no-op.
///
/// # Arguments
///
/// * `raw` - The reference as written in the document
/// * `base_url` - The URL the reference is resolved against
/// * `prefix` - The snapshot's rewrite prefix, e.g. `/snapshots/example.com/20240101000000/`
pub fn rewrite_reference(raw: &str, base_url: &Url, prefix: &str) -> String {
    let trimmed = raw.trim();

    if prefix.is_empty() || trimmed.is_empty() || trimmed.starts_with('#') {
        return raw.to_string();
    }

    if trimmed.starts_with(prefix) {
        return raw.to_string();
    }

    let resolved = match base_url.join(trimmed) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };

    if !is_fetchable(&resolved) || !same_origin(&resolved, base_url) {
        return raw.to_string();
    }

    // Root-relative prefixes can also be reached through an absolute same-origin URL
    if prefix.starts_with('/') && resolved.path().starts_with(prefix) {
        return raw.to_string();
    }

    let local_path = normalize_path_for_disk(&resolved);
    let mut local = format!(
        "{}{}",
        prefix,
        utf8_percent_encode(&local_path, LOCAL_PATH_ENCODE)
    );

    if let Some(fragment) = resolved.fragment() {
        local.push('#');
        local.push_str(fragment);
    }

    local
}
