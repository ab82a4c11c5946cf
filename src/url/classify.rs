use crate::url::domain::same_origin;
use url::Url;

/// File extensions treated as static assets
const ASSET_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "bmp", "ico",
    // Stylesheets and scripts
    "css", "js", "mjs", "map", "json",
    // Fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // Media
    "mp4", "webm", "mp3",
];

/// Scope decision for a link discovered while crawling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// Same-origin page - fetched and its links followed
    Page,
    /// Same-origin static asset - fetched
    Asset,
    /// Static asset on another origin, referenced by an in-scope page - fetched, never followed
    ForeignAsset,
    /// Anything else - never fetched
    OutOfScope,
}

impl LinkClass {
    /// Returns true if the link should be admitted to the frontier
    pub fn should_fetch(&self) -> bool {
        !matches!(self, Self::OutOfScope)
    }

    /// Returns true if the link lives on the seed's origin
    pub fn is_same_origin(&self) -> bool {
        matches!(self, Self::Page | Self::Asset)
    }
}

/// Returns true only for `http` and `https` URLs
pub fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Returns true if the URL path ends in a known static-asset extension
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wayback_lite::url::is_asset;
///
/// assert!(is_asset(&Url::parse("https://example.com/img/Logo.PNG").unwrap()));
/// assert!(!is_asset(&Url::parse("https://example.com/about").unwrap()));
/// ```
pub fn is_asset(url: &Url) -> bool {
    let last = url.path().rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ASSET_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// Classifies a discovered link relative to the crawl's seed
///
/// # Arguments
///
/// * `seed` - The seed URL that defines the crawl's origin
/// * `link` - An absolute URL found on an in-scope page
pub fn classify_link(seed: &Url, link: &Url) -> LinkClass {
    if !is_fetchable(link) {
        return LinkClass::OutOfScope;
    }

    match (same_origin(seed, link), is_asset(link)) {
        (true, false) => LinkClass::Page,
        (true, true) => LinkClass::Asset,
        (false, true) => LinkClass::ForeignAsset,
        (false, false) => LinkClass::OutOfScope,
    }
}

/// Returns true if a Content-Type header value denotes HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    let essence = media_type(content_type);
    essence == "text/html" || essence == "application/xhtml+xml"
}

/// Returns true if a Content-Type header value denotes CSS
pub fn is_css_content_type(content_type: &str) -> bool {
    media_type(content_type) == "text/css"
}

/// Strips parameters (`; charset=...`) and lowercases a Content-Type value
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_is_fetchable() {
        assert!(is_fetchable(&parse("http://example.com/")));
        assert!(is_fetchable(&parse("https://example.com/")));
        assert!(!is_fetchable(&parse("ftp://example.com/file")));
        assert!(!is_fetchable(&parse("mailto:someone@example.com")));
        assert!(!is_fetchable(&parse("data:image/png;base64,AAAA")));
    }

    #[test]
    fn test_is_asset_by_extension() {
        for path in [
            "/a.png", "/a.JPG", "/a.jpeg", "/a.gif", "/a.webp", "/a.svg", "/site.css",
            "/app.js", "/favicon.ico", "/font.woff", "/font.woff2", "/font.ttf",
        ] {
            assert!(is_asset(&parse(&format!("https://example.com{}", path))), "{}", path);
        }
    }

    #[test]
    fn test_is_asset_ignores_query() {
        assert!(is_asset(&parse("https://example.com/site.css?v=3")));
    }

    #[test]
    fn test_pages_are_not_assets() {
        assert!(!is_asset(&parse("https://example.com/")));
        assert!(!is_asset(&parse("https://example.com/about")));
        assert!(!is_asset(&parse("https://example.com/post.html")));
        assert!(!is_asset(&parse("https://example.com/.css")));
        assert!(!is_asset(&parse("https://example.com/css/")));
    }

    #[test]
    fn test_classify_link() {
        let seed = parse("https://example.com/");
        assert_eq!(
            classify_link(&seed, &parse("https://example.com/about")),
            LinkClass::Page
        );
        assert_eq!(
            classify_link(&seed, &parse("https://example.com/a.png")),
            LinkClass::Asset
        );
        assert_eq!(
            classify_link(&seed, &parse("https://cdn.example.net/a.png")),
            LinkClass::ForeignAsset
        );
        assert_eq!(
            classify_link(&seed, &parse("https://other.com/about")),
            LinkClass::OutOfScope
        );
        assert_eq!(
            classify_link(&seed, &parse("mailto:a@example.com")),
            LinkClass::OutOfScope
        );
    }

    #[test]
    fn test_link_class_predicates() {
        assert!(LinkClass::Page.should_fetch());
        assert!(LinkClass::Asset.should_fetch());
        assert!(LinkClass::ForeignAsset.should_fetch());
        assert!(!LinkClass::OutOfScope.should_fetch());

        assert!(LinkClass::Page.is_same_origin());
        assert!(LinkClass::Asset.is_same_origin());
        assert!(!LinkClass::ForeignAsset.is_same_origin());
    }

    #[test]
    fn test_content_types() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("TEXT/HTML"));
        assert!(!is_html_content_type("text/plain"));
        assert!(is_css_content_type("text/css; charset=utf-8"));
        assert!(!is_css_content_type("text/html"));
    }
}
