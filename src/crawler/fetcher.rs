//! Fetch backends
//!
//! This module defines the contract every fetch strategy implements, plus
//! the lightweight HTTP strategy:
//! - Building HTTP clients with a declared user agent and timeout
//! - One GET per URL, following redirects
//! - Error classification (timeout, status, transport)
//! - Link discovery for HTML pages and stylesheets

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::parser::{extract_css_links, extract_links};
use crate::url::{is_css_content_type, is_html_content_type};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for a single request
const MAX_REDIRECTS: usize = 10;

/// The two interchangeable ways of fetching a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET, no script execution
    Http,
    /// Headless browser, sees client-rendered DOM
    Browser,
}

impl FetchStrategy {
    /// Returns the strategy that is not `self`
    pub fn other(self) -> Self {
        match self {
            Self::Http => Self::Browser,
            Self::Browser => Self::Http,
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

impl FromStr for FetchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "browser" => Ok(Self::Browser),
            other => Err(format!(
                "unknown fetch strategy '{}', expected 'http' or 'browser'",
                other
            )),
        }
    }
}

/// Errors a fetch backend can report
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Browser error for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("{strategy} backend unavailable: {message}")]
    BackendUnavailable {
        strategy: FetchStrategy,
        message: String,
    },
}

impl FetchError {
    /// Returns true if the backend itself could not be started
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

/// What a successful fetch returns
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL the content was finally served from (after redirects)
    pub final_url: Url,

    /// Content-Type of the response
    pub content_type: String,

    /// Raw response body
    pub body: Vec<u8>,

    /// Absolute outbound links discovered in the body (fragment-free, deduplicated)
    pub links: Vec<Url>,
}

/// Contract shared by every fetch strategy
///
/// The crawler depends only on this trait, so the HTTP and browser backends
/// can be swapped per crawl.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// The strategy this backend implements
    fn strategy(&self) -> FetchStrategy;

    /// Fetches one URL, returning its content and discovered links
    async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError>;

    /// Releases backend resources once a crawl is over
    async fn shutdown(&self) {}
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Timeout applied to each request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use wayback_lite::config::UserAgentConfig;
/// use wayback_lite::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Lightweight strategy: one HTTP GET per URL
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher from crawler and user agent settings
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, FetchError> {
        let client = build_http_client(user_agent, crawler.request_timeout()).map_err(|e| {
            FetchError::BackendUnavailable {
                strategy: FetchStrategy::Http,
                message: e.to_string(),
            }
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Http
    }

    async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?
            .to_vec();

        // Only documents that can reference other resources are parsed
        let links = if is_html_content_type(&content_type) {
            extract_links(&String::from_utf8_lossy(&body), &final_url)
        } else if is_css_content_type(&content_type) {
            extract_css_links(&String::from_utf8_lossy(&body), &final_url)
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Fetched {} ({}, {} bytes, {} links)",
            url,
            content_type,
            body.len(),
            links.len()
        );

        Ok(Fetched {
            final_url,
            content_type,
            body,
            links,
        })
    }
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_http_fetcher_from_config() {
        let fetcher = HttpFetcher::new(&CrawlerConfig::default(), &UserAgentConfig::default());
        assert_eq!(fetcher.unwrap().strategy(), FetchStrategy::Http);
    }

    #[test]
    fn test_strategy_other() {
        assert_eq!(FetchStrategy::Http.other(), FetchStrategy::Browser);
        assert_eq!(FetchStrategy::Browser.other(), FetchStrategy::Http);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("http".parse::<FetchStrategy>(), Ok(FetchStrategy::Http));
        assert_eq!("Browser".parse::<FetchStrategy>(), Ok(FetchStrategy::Browser));
        assert!("curl".parse::<FetchStrategy>().is_err());
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(FetchStrategy::Http.to_string(), "http");
        assert_eq!(FetchStrategy::Browser.to_string(), "browser");
    }

    #[test]
    fn test_backend_unavailable_predicate() {
        let err = FetchError::BackendUnavailable {
            strategy: FetchStrategy::Browser,
            message: "no chrome".to_string(),
        };
        assert!(err.is_backend_unavailable());

        let err = FetchError::Status {
            url: "https://example.com/".to_string(),
            status: 404,
        };
        assert!(!err.is_backend_unavailable());
    }

    // Request/response behavior is covered with wiremock in the integration tests
}
