use crate::crawler::srcset_candidates;
use crate::rewrite::css::rewrite_css_with;
use crate::rewrite::reference::rewrite_reference;
use crate::rewrite::RewriteError;
use crate::url::is_fetchable;
use lol_html::html_content::{ContentType, Element};
use lol_html::{element, text, HtmlRewriter, Settings};
use std::cell::RefCell;
use std::error::Error;
use url::Url;

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Rewrites every reference in an HTML page so it points inside the snapshot
///
/// # Rewritten Locations
///
/// - `href` on `a`, `area` and `link`
/// - `src` on `img`, `script`, `source`, `iframe`, `video`, `audio`, `embed`, `track`
/// - `poster` on `video`
/// - each candidate of `srcset` on `img` and `source`
/// - `url(...)` inside `style` attributes and `<style>` blocks
///
/// Everything else in the document passes through byte-for-byte. Attributes
/// are only touched when their value actually changes, so rewriting an
/// already rewritten page returns it unchanged.
///
/// # Arguments
///
/// * `html` - The page as fetched
/// * `page_url` - The URL the page was fetched from, used to resolve relative references
/// * `prefix` - The snapshot's rewrite prefix
///
/// # Returns
///
/// * `Ok(String)` - The rewritten page
/// * `Err(RewriteError)` - The streaming rewriter rejected the input
///
/// # Example
///
/// ```
/// use url::Url;
/// use wayback_lite::rewrite::rewrite_html;
///
/// let page = Url::parse("https://example.com/").unwrap();
/// let html = r#"<a href="/about">About</a>"#;
/// let out = rewrite_html(html, &page, "/snapshots/example.com/20240101000000/").unwrap();
/// assert_eq!(out, r#"<a href="/snapshots/example.com/20240101000000/_/about">About</a>"#);
/// ```
pub fn rewrite_html(html: &str, page_url: &Url, prefix: &str) -> Result<String, RewriteError> {
    if prefix.is_empty() {
        return Ok(html.to_string());
    }

    let document = RefCell::new(DocumentBase::new(page_url));
    let style_text = RefCell::new(String::new());
    let mut output = Vec::with_capacity(html.len());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                // Dropped so the browser resolves localized paths against the snapshot
                element!("base", |el| {
                    if let Some(href) = el.get_attribute("href") {
                        document.borrow_mut().set_explicit(&href);
                    }
                    el.remove();
                    Ok(())
                }),
                element!("a[href], area[href], link[href]", |el| {
                    rewrite_attribute(el, "href", &document.borrow(), prefix)
                }),
                element!(
                    "img[src], script[src], source[src], iframe[src], video[src], audio[src], embed[src], track[src]",
                    |el| rewrite_attribute(el, "src", &document.borrow(), prefix)
                ),
                element!("video[poster]", |el| {
                    rewrite_attribute(el, "poster", &document.borrow(), prefix)
                }),
                element!("img[srcset], source[srcset]", |el| {
                    rewrite_srcset(el, &document.borrow(), prefix)
                }),
                element!("[style]", |el| {
                    rewrite_style_attribute(el, &document.borrow(), prefix)
                }),
                // Text arrives in chunks; the block is rewritten once it is complete
                text!("style", |chunk| {
                    style_text.borrow_mut().push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        let css = style_text.take();
                        let document = document.borrow();
                        let rewritten = rewrite_css_with(&css, |value| document.rewrite(value, prefix));
                        chunk.replace(&rewritten, ContentType::Html);
                    } else {
                        chunk.remove();
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |bytes: &[u8]| output.extend_from_slice(bytes),
    );

    rewriter.write(html.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

/// How references in one document are resolved
struct DocumentBase {
    page_url: Url,

    /// Target of the first `<base href>`, once seen
    explicit: Option<Url>,
}

impl DocumentBase {
    fn new(page_url: &Url) -> Self {
        Self {
            page_url: page_url.clone(),
            explicit: None,
        }
    }

    /// Only the first `<base href>` of a document counts
    fn set_explicit(&mut self, href: &str) {
        if self.explicit.is_none() {
            self.explicit = self.page_url.join(href.trim()).ok();
        }
    }

    /// Rewrites one reference as written in the document
    ///
    /// Under an explicit base, references are resolved first. Those that stay
    /// outside the snapshot are written out absolute, since the `<base>`
    /// element itself is removed.
    fn rewrite(&self, raw: &str, prefix: &str) -> String {
        let Some(base) = &self.explicit else {
            return rewrite_reference(raw, &self.page_url, prefix);
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(prefix) {
            return raw.to_string();
        }

        match base.join(trimmed) {
            Ok(absolute) if is_fetchable(&absolute) => {
                rewrite_reference(absolute.as_str(), &self.page_url, prefix)
            }
            _ => raw.to_string(),
        }
    }
}

fn rewrite_attribute(
    el: &mut Element<'_, '_>,
    name: &str,
    document: &DocumentBase,
    prefix: &str,
) -> HandlerResult {
    if let Some(value) = el.get_attribute(name) {
        let rewritten = document.rewrite(&value, prefix);
        if rewritten != value {
            el.set_attribute(name, &rewritten)?;
        }
    }
    Ok(())
}

fn rewrite_srcset(el: &mut Element<'_, '_>, document: &DocumentBase, prefix: &str) -> HandlerResult {
    let Some(value) = el.get_attribute("srcset") else {
        return Ok(());
    };

    let candidates: Vec<String> = srcset_candidates(&value)
        .into_iter()
        .map(|candidate| {
            let rewritten = document.rewrite(candidate.url, prefix);
            if candidate.descriptor.is_empty() {
                rewritten
            } else {
                format!("{} {}", rewritten, candidate.descriptor)
            }
        })
        .collect();

    let rewritten = candidates.join(", ");
    if rewritten != value {
        el.set_attribute("srcset", &rewritten)?;
    }
    Ok(())
}

fn rewrite_style_attribute(
    el: &mut Element<'_, '_>,
    document: &DocumentBase,
    prefix: &str,
) -> HandlerResult {
    if let Some(style) = el.get_attribute("style") {
        let rewritten = rewrite_css_with(&style, |value| document.rewrite(value, prefix));
        if rewritten != style {
            el.set_attribute("style", &rewritten)?;
        }
    }
    Ok(())
}
