//! Crawler module for fetching a site within its origin
//!
//! This module contains the core crawling logic, including:
//! - Interchangeable fetch strategies (plain HTTP, headless browser)
//! - HTML and CSS link extraction
//! - FIFO frontier scheduling under a page budget
//! - Overall crawl coordination and strategy fallback

mod browser;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use browser::launch_browser;
#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use coordinator::{
    crawl_with_fallback, CrawlFailure, CrawlOptions, CrawlReport, Crawler, DefaultFetcherFactory,
    FetcherFactory, Resource, StrategyPlan,
};
pub use fetcher::{
    build_http_client, FetchError, FetchStrategy, Fetched, Fetcher, HttpFetcher,
};
pub use parser::{extract_css_links, extract_links};
pub(crate) use parser::srcset_candidates;
pub use scheduler::Scheduler;
