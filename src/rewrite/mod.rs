//! Reference rewriting for offline browsing
//!
//! This module turns fetched HTML and CSS into documents whose same-origin
//! references point inside a snapshot:
//! - Single reference localization
//! - Streaming HTML attribute rewriting
//! - CSS `url(...)` rewriting
//!
//! All functions are pure and idempotent for a given prefix.

mod css;
mod html;
mod reference;

pub use css::{css_references, rewrite_css};
pub use html::rewrite_html;
pub use reference::rewrite_reference;

use thiserror::Error;

/// Errors raised while rewriting a document
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewrite failed: {0}")]
    Html(#[from] lol_html::errors::RewritingError),
}
