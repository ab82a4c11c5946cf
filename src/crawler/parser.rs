//! HTML parser for link discovery
//!
//! This module handles parsing fetched documents to find every resource
//! they reference:
//! - `href` and `src` attributes of any element
//! - `srcset` candidates and `poster` images
//! - CSS `url(...)` references in `style` attributes and `<style>` blocks
//! - CSS `url(...)` references in stylesheets

use crate::rewrite::css_references;
use crate::url::canonicalize;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts all fetchable links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `href`, `src` and `poster` attribute values on any element
/// - Every candidate URL of a `srcset` list
/// - `url(...)` references in inline `style` attributes and `<style>` blocks
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that does not resolve to an http(s) URL
///
/// Results are absolute, fragment-free and deduplicated in document order.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use url::Url;
/// use wayback_lite::crawler::extract_links;
///
/// let html = r#"<a href="/about">About</a><img src="logo.png">"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base);
/// assert_eq!(links.len(), 2);
/// assert_eq!(links[0].as_str(), "https://example.com/about");
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    // The first `<base href>` replaces the page URL for resolution
    let document_base = Selector::parse("base[href]")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok());
    let mut collector = LinkCollector::new(document_base.as_ref().unwrap_or(base_url));

    if let Ok(selector) = Selector::parse("[href], [src], [poster], [srcset], [style]") {
        for element in document.select(&selector) {
            let value = element.value();
            if value.name() == "base" {
                continue;
            }

            for attr in ["href", "src", "poster"] {
                if let Some(raw) = value.attr(attr) {
                    collector.push(raw);
                }
            }

            if let Some(srcset) = value.attr("srcset") {
                for candidate in srcset_candidates(srcset) {
                    collector.push(candidate.url);
                }
            }

            if let Some(style) = value.attr("style") {
                for reference in css_references(style) {
                    collector.push(&reference);
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("style") {
        for element in document.select(&selector) {
            let css: String = element.text().collect();
            for reference in css_references(&css) {
                collector.push(&reference);
            }
        }
    }

    collector.into_links()
}

/// Extracts all fetchable `url(...)` references from a stylesheet
pub fn extract_css_links(css: &str, base_url: &Url) -> Vec<Url> {
    let mut collector = LinkCollector::new(base_url);
    for reference in css_references(css) {
        collector.push(&reference);
    }
    collector.into_links()
}

/// One image candidate of a `srcset` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SrcsetCandidate<'a> {
    pub url: &'a str,

    /// Width or density descriptor, empty when absent
    pub descriptor: &'a str,
}

/// Splits a `srcset` attribute into its candidates
///
/// A candidate URL runs up to the next whitespace, so commas inside it (as in
/// `data:` URIs) stay part of the URL and only trailing commas end it. A
/// descriptor runs up to the next comma outside parentheses.
pub(crate) fn srcset_candidates(srcset: &str) -> Vec<SrcsetCandidate<'_>> {
    let bytes = srcset.as_bytes();
    let mut candidates = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let url = &srcset[start..pos];

        if url.ends_with(',') {
            candidates.push(SrcsetCandidate {
                url: url.trim_end_matches(','),
                descriptor: "",
            });
            continue;
        }

        let descriptor_start = pos;
        let mut depth = 0usize;
        while pos < bytes.len() {
            match bytes[pos] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => break,
                _ => {}
            }
            pos += 1;
        }

        candidates.push(SrcsetCandidate {
            url,
            descriptor: srcset[descriptor_start..pos].trim(),
        });
    }

    candidates
}

/// Resolves a link value to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(canonicalize(&absolute_url))
        }
        _ => None,
    }
}

/// Accumulates resolved links, keeping first-seen order
struct LinkCollector<'a> {
    base_url: &'a Url,
    seen: HashSet<Url>,
    links: Vec<Url>,
}

impl<'a> LinkCollector<'a> {
    fn new(base_url: &'a Url) -> Self {
        Self {
            base_url,
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn push(&mut self, raw: &str) {
        if let Some(url) = resolve_link(raw, self.base_url) {
            if self.seen.insert(url.clone()) {
                self.links.push(url);
            }
        }
    }

    fn into_links(self) -> Vec<Url> {
        self.links
    }
}
