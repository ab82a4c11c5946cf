use crate::rewrite::reference::rewrite_reference;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

/// Matches `url(...)` with double-quoted, single-quoted or bare contents
static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'"()\s]*))\s*\)"#)
        .expect("CSS url() pattern is valid")
});

/// Rewrites every `url(...)` reference in a piece of CSS
///
/// References are resolved against `base_url` (the page for inline CSS, the
/// stylesheet itself for external files) and localized under `prefix`. The
/// quoting style of each reference is preserved, and references that do not
/// change are left byte-for-byte as they were.
///
/// # Example
///
/// ```
/// use url::Url;
/// use wayback_lite::rewrite::rewrite_css;
///
/// let page = Url::parse("https://example.com/").unwrap();
/// let css = "body { background: url('/img/bg.png') }";
/// assert_eq!(
///     rewrite_css(css, &page, "/snapshots/example.com/20240101000000/"),
///     "body { background: url('/snapshots/example.com/20240101000000/_/img/bg.png') }"
/// );
/// ```
pub fn rewrite_css(css: &str, base_url: &Url, prefix: &str) -> String {
    rewrite_css_with(css, |value| rewrite_reference(value, base_url, prefix))
}

/// Rewrites every `url(...)` reference with a caller-supplied mapping
pub(crate) fn rewrite_css_with(css: &str, mut localize: impl FnMut(&str) -> String) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures| {
            let (quote, value) = quoted_value(caps);
            let rewritten = localize(value);
            if rewritten == value {
                caps[0].to_string()
            } else {
                format!("url({quote}{rewritten}{quote})")
            }
        })
        .into_owned()
}

/// Returns the raw contents of every non-empty `url(...)` in a piece of CSS
pub fn css_references(css: &str) -> Vec<String> {
    CSS_URL
        .captures_iter(css)
        .map(|caps| quoted_value(&caps).1.to_string())
        .filter(|value| !value.trim().is_empty())
        .collect()
}

/// Splits a `url(...)` match into its quote character and contents
fn quoted_value<'c>(caps: &Captures<'c>) -> (&'static str, &'c str) {
    if let Some(m) = caps.get(1) {
        ("\"", m.as_str())
    } else if let Some(m) = caps.get(2) {
        ("'", m.as_str())
    } else {
        ("", caps.get(3).map_or("", |m| m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/snapshots/example.com/20240101000000/";

    fn page() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_quoting_style_preserved() {
        let css = r#"a { background: url("/a.png") } b { background: url('/b.png') } c { background: url(/c.png) }"#;
        let out = rewrite_css(css, &page(), PREFIX);
        assert_eq!(
            out,
            format!(
                r#"a {{ background: url("{p}_/a.png") }} b {{ background: url('{p}_/b.png') }} c {{ background: url({p}_/c.png) }}"#,
                p = PREFIX
            )
        );
    }

    #[test]
    fn test_relative_resolved_against_base() {
        let out = rewrite_css("x { background: url(img/a.png) }", &page(), PREFIX);
        assert_eq!(
            out,
            format!("x {{ background: url({}_/blog/img/a.png) }}", PREFIX)
        );
    }

    #[test]
    fn test_off_origin_and_data_untouched() {
        let css = "a { background: url(https://cdn.other.net/a.png) } b { background: url(data:image/png;base64,AAAA) }";
        assert_eq!(rewrite_css(css, &page(), PREFIX), css);
    }

    #[test]
    fn test_whitespace_inside_parens_kept_when_unchanged() {
        let css = "a { background: url(  https://cdn.other.net/a.png  ) }";
        assert_eq!(rewrite_css(css, &page(), PREFIX), css);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let css = r#"@import url("/css/base.css"); a { background: url("../x y.png") }"#;
        let once = rewrite_css(css, &page(), PREFIX);
        let twice = rewrite_css(&once, &page(), PREFIX);
        assert_eq!(once, twice);
        assert!(once.contains("_/x%20y.png"));
    }

    #[test]
    fn test_css_references() {
        let refs = css_references(r#"a{src:url("a.woff")} b{background:URL(b.png)} c{background:url()}"#);
        assert_eq!(refs, vec!["a.woff", "b.png"]);
    }
}
