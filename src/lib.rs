//! Wayback-Lite: point-in-time, browsable offline snapshots of websites
//!
//! This crate crawls the pages reachable from a seed URL within its origin,
//! stores every fetched resource under a per-host, per-timestamp directory,
//! and rewrites HTML/CSS references so the copy can be browsed locally.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod rewrite;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Wayback-Lite operations
#[derive(Debug, Error)]
pub enum WaybackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid capture request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Rewrite error: {0}")]
    Rewrite(#[from] rewrite::RewriteError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Seed page could not be fetched: {url}")]
    SeedUnreachable { url: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelineState,
        to: state::PipelineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while validating a capture request, before any crawl starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("url is required")]
    MissingUrl,

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported url scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("max pages must be between {min} and {max}, got {value}")]
    PageBudget { value: usize, min: usize, max: usize },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Wayback-Lite operations
pub type Result<T> = std::result::Result<T, WaybackError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::pipeline::{CaptureOutcome, Pipeline, TriggerRequest};
pub use crate::progress::{ProgressEvent, ProgressPhase, ProgressRegistry};
pub use crate::state::PipelineState;
pub use crate::url::{
    extract_host, is_asset, is_fetchable, normalize_path_for_disk, same_origin,
};
