//! Headless browser fetch strategy
//!
//! Pages are loaded in a headless Chromium so client-rendered DOM is captured:
//! - One browser process per crawl, launched up front
//! - A fresh tab per URL, closed on every path
//! - Static assets bypass the browser and are fetched over plain HTTP
//!
//! The strategy is only compiled with the `browser` feature. Without it,
//! [`launch_browser`] reports the backend as unavailable so the crawl falls
//! back to HTTP.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::fetcher::{FetchError, FetchStrategy, Fetcher};
use url::Url;

#[cfg(feature = "browser")]
pub use self::chromium::BrowserFetcher;

/// Launches the browser strategy
///
/// # Returns
///
/// * `Ok(Box<dyn Fetcher>)` - A running browser backend
/// * `Err(FetchError::BackendUnavailable)` - Chromium could not be started, or
///   the crate was built without the `browser` feature
#[cfg(feature = "browser")]
pub async fn launch_browser(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Box<dyn Fetcher>, FetchError> {
    let fetcher = BrowserFetcher::launch(crawler, user_agent).await?;
    Ok(Box::new(fetcher))
}

#[cfg(not(feature = "browser"))]
pub async fn launch_browser(
    _crawler: &CrawlerConfig,
    _user_agent: &UserAgentConfig,
) -> Result<Box<dyn Fetcher>, FetchError> {
    Err(FetchError::BackendUnavailable {
        strategy: FetchStrategy::Browser,
        message: "built without the browser feature".to_string(),
    })
}

/// Maps the main document's HTTP status onto a fetch result
///
/// A navigation without a response status (served from cache, `about:` pages)
/// counts as a success.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn check_navigation_status(url: &Url, status: Option<i64>) -> Result<(), FetchError> {
    match status {
        Some(status) if !(200..300).contains(&status) => Err(FetchError::Status {
            url: url.to_string(),
            status: u16::try_from(status).unwrap_or(0),
        }),
        _ => Ok(()),
    }
}

#[cfg(feature = "browser")]
mod chromium {
    use super::*;
    use crate::crawler::fetcher::{Fetched, HttpFetcher};
    use crate::crawler::parser::extract_links;
    use crate::url::{canonicalize, is_asset};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::Page;
    use futures::StreamExt;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    /// Time given to client-side scripts after navigation completes
    const SETTLE_DELAY: Duration = Duration::from_millis(500);

    const ANCHORS_SCRIPT: &str =
        "Array.from(document.querySelectorAll('a[href]')).map(a => a.href).filter(h => !!h)";

    /// Fetch strategy driving a headless Chromium
    pub struct BrowserFetcher {
        browser: Mutex<Browser>,
        handler: JoinHandle<()>,
        assets: HttpFetcher,
        navigation_timeout: Duration,
    }

    impl BrowserFetcher {
        /// Starts Chromium and its event loop
        pub async fn launch(
            crawler: &CrawlerConfig,
            user_agent: &UserAgentConfig,
        ) -> Result<Self, FetchError> {
            let unavailable = |message: String| FetchError::BackendUnavailable {
                strategy: FetchStrategy::Browser,
                message,
            };

            let mut builder = BrowserConfig::builder()
                .request_timeout(crawler.navigation_timeout())
                .no_sandbox()
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--mute-audio")
                .arg(format!("--user-agent={}", user_agent.header_value()));

            if let Some(ref chrome_path) = crawler.chrome_path {
                builder = builder.chrome_executable(chrome_path);
            }

            let config = builder.build().map_err(unavailable)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| unavailable(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!("Browser handler error: {}", e);
                    }
                }
            });

            tracing::info!("Headless browser launched");

            Ok(Self {
                browser: Mutex::new(browser),
                handler,
                assets: HttpFetcher::new(crawler, user_agent)?,
                navigation_timeout: crawler.navigation_timeout(),
            })
        }

        async fn render(&self, page: &Page, url: &Url) -> Result<Fetched, FetchError> {
            let browser_error = |e: chromiumoxide::error::CdpError| FetchError::Browser {
                url: url.to_string(),
                message: e.to_string(),
            };

            page.goto(url.as_str()).await.map_err(browser_error)?;
            let navigation = page
                .wait_for_navigation_response()
                .await
                .map_err(browser_error)?;
            let status = navigation
                .as_ref()
                .and_then(|request| request.response.as_ref())
                .map(|response| response.status);
            check_navigation_status(url, status)?;

            tokio::time::sleep(SETTLE_DELAY).await;

            let html = page.content().await.map_err(browser_error)?;

            let content_type = page
                .evaluate("document.contentType || 'text/html'")
                .await
                .map_err(browser_error)?
                .into_value::<String>()
                .unwrap_or_else(|_| "text/html".to_string());

            let final_url = page
                .url()
                .await
                .map_err(browser_error)?
                .and_then(|u| Url::parse(&u).ok())
                .unwrap_or_else(|| url.clone());

            let anchors = page
                .evaluate(ANCHORS_SCRIPT)
                .await
                .map_err(browser_error)?
                .into_value::<Vec<String>>()
                .unwrap_or_default();

            // Live anchors first, then everything the serialized DOM references
            let mut seen = HashSet::new();
            let links = anchors
                .iter()
                .filter_map(|href| Url::parse(href).ok())
                .filter(|u| matches!(u.scheme(), "http" | "https"))
                .map(|u| canonicalize(&u))
                .chain(extract_links(&html, &final_url))
                .filter(|u| seen.insert(u.clone()))
                .collect();

            Ok(Fetched {
                final_url,
                content_type,
                body: html.into_bytes(),
                links,
            })
        }
    }

    #[async_trait]
    impl Fetcher for BrowserFetcher {
        fn strategy(&self) -> FetchStrategy {
            FetchStrategy::Browser
        }

        async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError> {
            // A browser wraps images and scripts in a viewer document
            if is_asset(url) {
                return self.assets.fetch(url).await;
            }

            let page = {
                let browser = self.browser.lock().await;
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| FetchError::Browser {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?
            };

            let result = match tokio::time::timeout(self.navigation_timeout, self.render(&page, url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: url.to_string(),
                }),
            };

            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close page for {}: {}", url, e);
            }

            if result.is_ok() {
                tracing::debug!("Rendered {}", url);
            }
            result
        }

        async fn shutdown(&self) {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                tracing::error!("Failed to close browser: {}", e);
            } else {
                tracing::info!("Browser shutdown complete");
            }
            self.handler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_status_success() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(check_navigation_status(&url, Some(200)).is_ok());
        assert!(check_navigation_status(&url, Some(204)).is_ok());
        assert!(check_navigation_status(&url, None).is_ok());
    }

    #[test]
    fn test_navigation_status_error() {
        let url = Url::parse("https://example.com/missing").unwrap();
        match check_navigation_status(&url, Some(404)) {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected a status error, got {:?}", other),
        }
        assert!(check_navigation_status(&url, Some(500)).is_err());
        assert!(check_navigation_status(&url, Some(301)).is_err());
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_launch_without_feature_is_unavailable() {
        let result = launch_browser(&CrawlerConfig::default(), &UserAgentConfig::default()).await;
        match result {
            Err(e) => assert!(e.is_backend_unavailable()),
            Ok(_) => panic!("browser backend should be unavailable"),
        }
    }

    #[cfg(feature = "browser")]
    #[tokio::test]
    async fn test_browser_reports_error_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html><body>home</body></html>", "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(
                ResponseTemplate::new(404).set_body_raw("<html><body>not found</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let fetcher = match launch_browser(&CrawlerConfig::default(), &UserAgentConfig::default()).await {
            Ok(fetcher) => fetcher,
            Err(e) => {
                // No Chromium on this machine
                assert!(e.is_backend_unavailable());
                return;
            }
        };

        let home = Url::parse(&format!("{}/", server.uri())).unwrap();
        let fetched = fetcher.fetch(&home).await.unwrap();
        assert!(String::from_utf8_lossy(&fetched.body).contains("home"));

        let gone = Url::parse(&format!("{}/gone", server.uri())).unwrap();
        let result = fetcher.fetch(&gone).await;
        fetcher.shutdown().await;

        match result {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected a status error, got {:?}", other.map(|f| f.final_url)),
        }
    }
}
