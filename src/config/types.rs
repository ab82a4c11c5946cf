use crate::crawler::FetchStrategy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest page budget a capture may request
pub const MIN_PAGE_BUDGET: usize = 1;

/// Largest page budget a capture may request
pub const MAX_PAGE_BUDGET: usize = 50;

/// Main configuration structure for Wayback-Lite
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Default page budget when a capture request does not give one
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum number of fetches in flight at once
    pub concurrency: usize,

    /// Per-request timeout for the HTTP strategy (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Per-navigation timeout for the browser strategy (seconds)
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,

    /// Strategy tried first for every crawl
    pub strategy: FetchStrategy,

    /// Whether the other strategy is tried once if the first fails outright
    pub fallback: bool,

    /// Path to a Chrome/Chromium executable (None for auto-detection)
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            concurrency: 5,
            timeout_secs: 15,
            navigation_timeout_secs: 60,
            strategy: FetchStrategy::Http,
            fallback: true,
            chrome_path: None,
        }
    }
}

impl CrawlerConfig {
    /// Timeout applied to each HTTP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout applied to each browser navigation
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// The strategy used if the primary one fails outright, when enabled
    pub fn fallback_strategy(&self) -> Option<FetchStrategy> {
        self.fallback.then(|| self.strategy.other())
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Wayback-Lite".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding `snapshots/` and `manifest.json`
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}
