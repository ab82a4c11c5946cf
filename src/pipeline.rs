//! Capture pipeline
//!
//! One capture runs these stages in order, never skipping one:
//! 1. Reserving - a fresh snapshot directory is created
//! 2. Crawling - the site is fetched with the configured strategy plan
//! 3. Saving - resources are rewritten and written in crawl order, one at a time
//! 4. Finalizing - the seed page is copied to the landing `index.html`
//! 5. Recorded - the capture is appended to the manifest
//!
//! An error in any stage moves the capture to `Failed` and is returned to the
//! caller. Files written before the failure are left on disk.

use crate::config::{Config, MAX_PAGE_BUDGET, MIN_PAGE_BUDGET};
use crate::crawler::{
    crawl_with_fallback, CrawlOptions, DefaultFetcherFactory, FetchStrategy, FetcherFactory,
    Resource, StrategyPlan,
};
use crate::progress::{NoopSink, ProgressEvent, ProgressPhase, ProgressRegistry, ProgressSink};
use crate::rewrite::{rewrite_css, rewrite_html};
use crate::state::PipelineState;
use crate::storage::{timestamp_now, FsStorage, SnapshotHandle, Storage};
use crate::url::same_origin;
use crate::{ValidationError, WaybackError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// A request to capture a site
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    /// Seed URL
    pub url: String,

    /// Page budget; the configured default is used when absent
    pub max_pages: Option<usize>,

    /// Key progress events are published under
    pub progress_id: Option<String>,
}

impl TriggerRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_progress_id(mut self, progress_id: impl Into<String>) -> Self {
        self.progress_id = Some(progress_id.into());
        self
    }

    /// Validates the request before any work starts
    ///
    /// # Arguments
    ///
    /// * `default_max_pages` - Budget used when the request has none
    ///
    /// # Returns
    ///
    /// * `Ok((Url, usize))` - The seed URL (fragment removed) and the page budget
    /// * `Err(ValidationError)` - The URL is missing, malformed or not http(s),
    ///   or the budget is outside 1..=50
    pub fn validate(&self, default_max_pages: usize) -> Result<(Url, usize), ValidationError> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingUrl);
        }

        let mut seed = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(seed.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(seed.scheme().to_string()));
        }

        if seed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            });
        }
        seed.set_fragment(None);

        let max_pages = self.max_pages.unwrap_or(default_max_pages);
        if !(MIN_PAGE_BUDGET..=MAX_PAGE_BUDGET).contains(&max_pages) {
            return Err(ValidationError::PageBudget {
                value: max_pages,
                min: MIN_PAGE_BUDGET,
                max: MAX_PAGE_BUDGET,
            });
        }

        Ok((seed, max_pages))
    }
}

/// What a successful capture produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutcome {
    pub host: String,
    pub timestamp: String,
    pub base_prefix: String,
    pub resource_count: usize,
    #[serde(skip)]
    pub strategy: Option<FetchStrategy>,
}

/// Runs captures against one storage backend
pub struct Pipeline {
    config: Config,
    storage: Arc<dyn Storage>,
    fetchers: Arc<dyn FetcherFactory>,
    progress: ProgressRegistry,
}

impl Pipeline {
    /// Creates a pipeline using the real fetch backends
    pub fn new(config: Config, storage: Arc<dyn Storage>, progress: ProgressRegistry) -> Self {
        let fetchers = Arc::new(DefaultFetcherFactory::new(&config));
        Self {
            config,
            storage,
            fetchers,
            progress,
        }
    }

    /// Creates a pipeline storing snapshots under the configured data directory
    pub fn open(config: Config, progress: ProgressRegistry) -> Result<Self, WaybackError> {
        let storage = FsStorage::open(config.output.data_path())?;
        Ok(Self::new(config, Arc::new(storage), progress))
    }

    /// Replaces the fetch backend factory
    pub fn with_fetcher_factory(mut self, fetchers: Arc<dyn FetcherFactory>) -> Self {
        self.fetchers = fetchers;
        self
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn progress(&self) -> &ProgressRegistry {
        &self.progress
    }

    /// Captures a site
    ///
    /// The request is validated first; an invalid request fails without
    /// touching storage. Progress events go to the subscriber registered
    /// under the request's progress id, whose entry is removed once the
    /// capture ends either way.
    ///
    /// # Returns
    ///
    /// * `Ok(CaptureOutcome)` - The capture is recorded
    /// * `Err(WaybackError)` - The error that stopped the capture
    pub async fn run(&self, request: TriggerRequest) -> Result<CaptureOutcome, WaybackError> {
        let (seed, max_pages) = request.validate(self.config.crawler.max_pages)?;

        let sink: Box<dyn ProgressSink> = match &request.progress_id {
            Some(id) => Box::new(self.progress.publisher(id.clone())),
            None => Box::new(NoopSink),
        };

        let mut state = PipelineState::Reserving;
        let result = self.execute(&seed, max_pages, sink.as_ref(), &mut state).await;

        if let Some(id) = &request.progress_id {
            self.progress.unsubscribe(id);
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!("Capture of {} failed while {}: {}", seed, state, e);
                if state.can_transition_to(PipelineState::Failed) {
                    state = PipelineState::Failed;
                }
                tracing::debug!("Capture of {} ended in state {}", seed, state);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        seed: &Url,
        max_pages: usize,
        sink: &dyn ProgressSink,
        state: &mut PipelineState,
    ) -> Result<CaptureOutcome, WaybackError> {
        let mut handle = self.storage.reserve_unique(seed, &timestamp_now())?;
        let prefix = handle.base_prefix();
        tracing::info!("Reserved snapshot {}/{}", handle.host, handle.timestamp);

        advance(state, PipelineState::Crawling)?;
        let plan = StrategyPlan::from_config(&self.config.crawler);
        let options = CrawlOptions::from_config(&self.config.crawler).with_max_pages(max_pages);
        let report = crawl_with_fallback(self.fetchers.as_ref(), plan, seed, options, sink).await?;

        // A seed redirected to another origin makes that origin the site
        let site = &report.seed;
        if !same_origin(site, &handle.origin) {
            handle.rebase(site);
        }

        advance(state, PipelineState::Saving)?;
        let total = report.resources.len();
        for (index, resource) in report.resources.iter().enumerate() {
            self.save_resource(&handle, site, &prefix, resource)?;
            sink.emit(ProgressEvent::new(
                ProgressPhase::Save,
                index + 1,
                max_pages,
                resource.url.as_str(),
            ));
        }

        advance(state, PipelineState::Finalizing)?;
        self.storage.finalize(&handle, site)?;

        self.storage.record(seed, &handle.timestamp)?;
        advance(state, PipelineState::Recorded)?;

        tracing::info!(
            "Captured {} resources of {} into {}",
            total,
            site,
            prefix
        );

        Ok(CaptureOutcome {
            host: handle.host,
            timestamp: handle.timestamp,
            base_prefix: prefix,
            resource_count: total,
            strategy: Some(report.strategy),
        })
    }

    /// Rewrites a same-origin HTML page or stylesheet, then writes it
    fn save_resource(
        &self,
        handle: &SnapshotHandle,
        seed: &Url,
        prefix: &str,
        resource: &Resource,
    ) -> Result<String, WaybackError> {
        let rewritable = same_origin(&resource.url, seed) && same_origin(&resource.final_url, seed);

        let rel = if rewritable && resource.is_html() {
            let html = String::from_utf8_lossy(&resource.body);
            let rewritten = rewrite_html(&html, &resource.final_url, prefix)?;
            self.storage.write(handle, &resource.url, rewritten.as_bytes())?
        } else if rewritable && resource.is_css() {
            let css = String::from_utf8_lossy(&resource.body);
            let rewritten = rewrite_css(&css, &resource.final_url, prefix);
            self.storage.write(handle, &resource.url, rewritten.as_bytes())?
        } else {
            self.storage.write(handle, &resource.url, &resource.body)?
        };

        Ok(rel)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) -> Result<(), WaybackError> {
    if !state.can_transition_to(next) {
        return Err(WaybackError::InvalidTransition {
            from: *state,
            to: next,
        });
    }
    tracing::debug!("Pipeline {} -> {}", state, next);
    *state = next;
    Ok(())
}
