//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates one capture's fetching,
//! including:
//! - Breadth-first traversal in bounded concurrent batches
//! - Same-origin containment and asset admission
//! - Progress reporting per completed fetch
//! - Restarting the whole crawl with the fallback strategy when the primary one fails outright

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use crate::crawler::browser::launch_browser;
use crate::crawler::fetcher::{FetchError, FetchStrategy, Fetcher, HttpFetcher};
use crate::crawler::scheduler::Scheduler;
use crate::progress::{ProgressEvent, ProgressPhase, ProgressSink};
use crate::url::{canonicalize, classify_link, is_css_content_type, is_html_content_type, same_origin};
use crate::WaybackError;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use url::Url;

/// Limits applied to a single crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Maximum number of URLs fetched
    pub max_pages: usize,

    /// Maximum number of fetches in flight at once
    pub concurrency: usize,
}

impl CrawlOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            concurrency: config.concurrency,
        }
    }

    /// Returns a copy with a different page budget
    pub fn with_max_pages(self, max_pages: usize) -> Self {
        Self { max_pages, ..self }
    }
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// A successfully fetched resource, ready to be stored
#[derive(Debug, Clone)]
pub struct Resource {
    /// The URL that was requested (the frontier entry)
    pub url: Url,

    /// The URL the content was finally served from
    pub final_url: Url,

    pub content_type: String,

    pub body: Vec<u8>,
}

impl Resource {
    pub fn is_html(&self) -> bool {
        is_html_content_type(&self.content_type)
    }

    pub fn is_css(&self) -> bool {
        is_css_content_type(&self.content_type)
    }
}

/// A URL that could not be fetched
#[derive(Debug)]
pub struct CrawlFailure {
    pub url: Url,
    pub error: FetchError,
}

/// Everything one crawl produced
#[derive(Debug)]
pub struct CrawlReport {
    /// Strategy that produced these resources
    pub strategy: FetchStrategy,

    /// The seed, or the URL it redirected to on another origin; the crawl
    /// stays within this URL's origin
    pub seed: Url,

    /// Resources in the order their fetches completed
    pub resources: Vec<Resource>,

    /// URLs whose fetch failed and was skipped
    pub failures: Vec<CrawlFailure>,

    /// Whether the seed itself was fetched
    pub seed_fetched: bool,
}

impl CrawlReport {
    fn new(strategy: FetchStrategy, seed: Url) -> Self {
        Self {
            strategy,
            seed,
            resources: Vec::new(),
            failures: Vec::new(),
            seed_fetched: false,
        }
    }

    /// Number of URLs the crawl attempted
    pub fn attempted(&self) -> usize {
        self.resources.len() + self.failures.len()
    }
}

/// Runs a bounded breadth-first crawl with one fetch backend
pub struct Crawler<'f> {
    fetcher: &'f dyn Fetcher,
    options: CrawlOptions,
}

impl<'f> Crawler<'f> {
    pub fn new(fetcher: &'f dyn Fetcher, options: CrawlOptions) -> Self {
        Self { fetcher, options }
    }

    /// Crawls from `seed`, staying within its origin
    ///
    /// This method:
    /// 1. Admits the seed into a FIFO frontier
    /// 2. Takes up to `concurrency` unvisited URLs and fetches them concurrently
    /// 3. Emits one crawl progress event per completed fetch, in completion order
    /// 4. Admits links found in same-origin HTML pages and stylesheets: same-origin
    ///    URLs, plus assets from any origin
    /// 5. Repeats until the frontier is empty or the page budget is spent
    ///
    /// Failed fetches are logged and skipped; they still count against the budget.
    /// If the seed redirects to another origin (`http` to `https`, apex to
    /// `www`), the crawl continues within the origin it landed on and the
    /// seed resource is reported under its final URL.
    ///
    /// # Arguments
    ///
    /// * `seed` - The URL the crawl starts from
    /// * `sink` - Receives crawl progress events
    pub async fn crawl(&self, seed: &Url, sink: &dyn ProgressSink) -> CrawlReport {
        let seed = canonicalize(seed);
        let max_pages = self.options.max_pages;
        let concurrency = self.options.concurrency.max(1);

        let mut scheduler = Scheduler::new(&seed, max_pages);
        let mut report = CrawlReport::new(self.fetcher.strategy(), seed.clone());

        tracing::info!(
            "Crawling {} with {} strategy (max {} pages, concurrency {})",
            seed,
            self.fetcher.strategy(),
            max_pages,
            concurrency
        );

        while !scheduler.is_exhausted() {
            let batch = scheduler.next_batch(concurrency);
            if batch.is_empty() {
                break;
            }

            let mut in_flight: FuturesUnordered<_> = batch
                .into_iter()
                .map(|url| async move {
                    let result = self.fetcher.fetch(&url).await;
                    (url, result)
                })
                .collect();

            let mut discovered = Vec::new();

            while let Some((url, result)) = in_flight.next().await {
                sink.emit(ProgressEvent::new(
                    ProgressPhase::Crawl,
                    scheduler.visited_count(),
                    max_pages,
                    url.as_str(),
                ));

                match result {
                    Ok(fetched) => {
                        let mut url = url;
                        if url == seed {
                            report.seed_fetched = true;

                            let landed = canonicalize(&fetched.final_url);
                            if !same_origin(&landed, &seed) {
                                tracing::info!("Seed {} redirected to {}, crawling that origin", seed, landed);
                                scheduler.redirect(&url, &landed);
                                report.seed = landed.clone();
                                url = landed;
                            }
                        }

                        let origin = &report.seed;
                        let in_scope = same_origin(&url, origin) && same_origin(&fetched.final_url, origin);
                        let parseable = is_html_content_type(&fetched.content_type)
                            || is_css_content_type(&fetched.content_type);
                        if in_scope && parseable {
                            discovered.extend(fetched.links);
                        }

                        report.resources.push(Resource {
                            url,
                            final_url: fetched.final_url,
                            content_type: fetched.content_type,
                            body: fetched.body,
                        });
                    }
                    Err(error) => {
                        tracing::warn!("Skipping {}: {}", url, error);
                        report.failures.push(CrawlFailure { url, error });
                    }
                }
            }

            for link in discovered {
                if classify_link(&report.seed, &link).should_fetch() {
                    scheduler.admit(&link);
                }
            }
        }

        tracing::info!(
            "Crawl of {} finished: {} fetched, {} failed",
            seed,
            report.resources.len(),
            report.failures.len()
        );

        report
    }
}

/// Which strategy to try first, and which one to fall back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPlan {
    pub primary: FetchStrategy,
    pub fallback: Option<FetchStrategy>,
}

impl StrategyPlan {
    pub fn new(primary: FetchStrategy, fallback: Option<FetchStrategy>) -> Self {
        // A fallback identical to the primary would just repeat the same crawl
        let fallback = fallback.filter(|f| *f != primary);
        Self { primary, fallback }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.strategy, config.fallback_strategy())
    }

    /// Strategies in the order they are attempted
    pub fn strategies(&self) -> impl Iterator<Item = FetchStrategy> {
        std::iter::once(self.primary).chain(self.fallback)
    }
}

/// Creates fetch backends on demand
#[async_trait]
pub trait FetcherFactory: Send + Sync {
    async fn build(&self, strategy: FetchStrategy) -> Result<Box<dyn Fetcher>, FetchError>;
}

/// Factory building the real HTTP and browser backends from configuration
#[derive(Debug, Clone)]
pub struct DefaultFetcherFactory {
    crawler: CrawlerConfig,
    user_agent: UserAgentConfig,
}

impl DefaultFetcherFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            crawler: config.crawler.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl FetcherFactory for DefaultFetcherFactory {
    async fn build(&self, strategy: FetchStrategy) -> Result<Box<dyn Fetcher>, FetchError> {
        match strategy {
            FetchStrategy::Http => {
                let fetcher = HttpFetcher::new(&self.crawler, &self.user_agent)?;
                Ok(Box::new(fetcher))
            }
            FetchStrategy::Browser => launch_browser(&self.crawler, &self.user_agent).await,
        }
    }
}

/// Crawls with the primary strategy, restarting once with the fallback
///
/// The primary strategy fails outright when its backend cannot be started or
/// when the seed itself cannot be fetched. In that case the whole crawl is
/// restarted from scratch with the fallback; resources from the failed
/// attempt are discarded. Only the two strategies of the plan are ever tried.
///
/// # Returns
///
/// * `Ok(CrawlReport)` - A crawl whose seed was fetched
/// * `Err(WaybackError::SeedUnreachable)` - No strategy could fetch the seed
/// * `Err(WaybackError::Fetch)` - The last strategy's backend could not be started
pub async fn crawl_with_fallback(
    factory: &dyn FetcherFactory,
    plan: StrategyPlan,
    seed: &Url,
    options: CrawlOptions,
    sink: &dyn ProgressSink,
) -> Result<CrawlReport, WaybackError> {
    let mut last_error = None;

    for strategy in plan.strategies() {
        let fetcher = match factory.build(strategy).await {
            Ok(fetcher) => fetcher,
            Err(e) => {
                tracing::warn!("{} strategy unavailable: {}", strategy, e);
                last_error = Some(WaybackError::Fetch(e));
                continue;
            }
        };

        let report = Crawler::new(fetcher.as_ref(), options).crawl(seed, sink).await;
        fetcher.shutdown().await;

        if report.seed_fetched {
            return Ok(report);
        }

        tracing::warn!("{} strategy could not fetch seed {}", strategy, seed);
        last_error = Some(WaybackError::SeedUnreachable {
            url: seed.to_string(),
        });
    }

    Err(last_error.unwrap_or_else(|| WaybackError::SeedUnreachable {
        url: seed.to_string(),
    }))
}
