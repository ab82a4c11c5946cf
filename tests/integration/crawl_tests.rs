//! Integration tests for the capture pipeline
//!
//! These tests use wiremock to create mock HTTP servers and run full
//! captures end-to-end into a temporary data directory.

use tempfile::TempDir;
use wayback_lite::config::Config;
use wayback_lite::crawler::FetchStrategy;
use wayback_lite::storage::Storage;
use wayback_lite::{Pipeline, ProgressPhase, ProgressRegistry, TriggerRequest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration storing snapshots under `data_dir`
fn create_test_config(data_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.output.data_dir = data_dir.path().to_string_lossy().into_owned();
    config.crawler.concurrency = 2;
    config.crawler.timeout_secs = 5;
    config
}

/// Mounts an HTML page at `route`
async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Mounts a raw body with the given content type at `route`
async fn mount_raw(server: &MockServer, route: &str, body: &[u8], mime: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), mime))
        .mount(server)
        .await;
}

/// The `host:port` a mock server's snapshots are grouped under
fn server_host(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).expect("Failed to parse server URL");
    format!(
        "{}:{}",
        url.host_str().expect("Failed to extract host"),
        url.port().expect("Mock server has an explicit port")
    )
}

#[tokio::test]
async fn test_capture_single_page() {
    let server = MockServer::start().await;
    mount_html(&server, "/", "<html><body><h1>Hello</h1></body></html>").await;

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();

    let outcome = pipeline
        .run(TriggerRequest::new(format!("{}/", server.uri())))
        .await
        .expect("Capture failed");

    assert_eq!(outcome.host, server_host(&server));
    assert_eq!(outcome.resource_count, 1);
    assert_eq!(outcome.strategy, Some(FetchStrategy::Http));
    assert_eq!(
        outcome.base_prefix,
        format!("/snapshots/{}/{}/", outcome.host, outcome.timestamp)
    );

    // The seed page is stored at its own path and as the snapshot landing page
    let storage = pipeline.storage();
    let landing = storage
        .read_raw(&outcome.host, &outcome.timestamp, "index.html")
        .unwrap();
    let stored = storage
        .read_raw(&outcome.host, &outcome.timestamp, "_/index.html")
        .unwrap();
    assert_eq!(landing, stored);
    assert!(String::from_utf8_lossy(&landing).contains("<h1>Hello</h1>"));
}

#[tokio::test]
async fn test_capture_follows_same_origin_links() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body>
            <a href="/about">About</a>
            <a href="contact">Contact</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
            <a href="mailto:me@example.com">Mail</a>
        </body></html>"#,
    )
    .await;
    mount_html(&server, "/about", "<html><body>About us</body></html>").await;
    mount_html(&server, "/contact", "<html><body>Contact us</body></html>").await;

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();
    let seed = format!("{}/", server.uri());

    let outcome = pipeline.run(TriggerRequest::new(seed.clone())).await.unwrap();
    assert_eq!(outcome.resource_count, 3);

    let storage = pipeline.storage();
    let about = storage
        .read_raw(&outcome.host, &outcome.timestamp, "_/about")
        .unwrap();
    assert!(String::from_utf8_lossy(&about).contains("About us"));

    // Links into the site now point inside the snapshot; foreign ones stay absolute
    let index = storage
        .read_raw(&outcome.host, &outcome.timestamp, "index.html")
        .unwrap();
    let index = String::from_utf8_lossy(&index);
    assert!(index.contains(&format!(r#"href="{}_/about""#, outcome.base_prefix)));
    assert!(index.contains(&format!(r#"href="{}_/contact""#, outcome.base_prefix)));
    assert!(index.contains(r#"href="https://elsewhere.example/""#));
    assert!(index.contains(r#"href="mailto:me@example.com""#));

    let seed_url = url::Url::parse(&seed).unwrap();
    assert_eq!(storage.list_by_host(&seed_url).unwrap(), vec![outcome.timestamp.clone()]);
    assert_eq!(
        storage.manifest().unwrap().get(&outcome.host),
        Some(&vec![outcome.timestamp])
    );
}

#[tokio::test]
async fn test_capture_respects_page_budget() {
    let server = MockServer::start().await;
    let links: String = (1..=5)
        .map(|i| format!(r#"<a href="/p{}">Page {}</a>"#, i, i))
        .collect();
    mount_html(&server, "/", &format!("<html><body>{}</body></html>", links)).await;
    for i in 1..=5 {
        mount_html(&server, &format!("/p{}", i), "<html><body>page</body></html>").await;
    }

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();

    let outcome = pipeline
        .run(TriggerRequest::new(format!("{}/", server.uri())).with_max_pages(3))
        .await
        .unwrap();

    assert_eq!(outcome.resource_count, 3);
}

#[tokio::test]
async fn test_capture_rewrites_assets_and_keeps_bytes() {
    let server = MockServer::start().await;
    let png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

    mount_html(
        &server,
        "/",
        r#"<html><head><link rel="stylesheet" href="/css/site.css"></head>
        <body><img src="img/logo.png"></body></html>"#,
    )
    .await;
    mount_raw(
        &server,
        "/css/site.css",
        b"body { background: url(../img/bg.png); }",
        "text/css",
    )
    .await;
    mount_raw(&server, "/img/logo.png", &png, "image/png").await;
    mount_raw(&server, "/img/bg.png", &png, "image/png").await;

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();

    let outcome = pipeline
        .run(TriggerRequest::new(format!("{}/", server.uri())))
        .await
        .unwrap();
    assert_eq!(outcome.resource_count, 4);

    let storage = pipeline.storage();
    let prefix = &outcome.base_prefix;

    let index = storage
        .read_raw(&outcome.host, &outcome.timestamp, "index.html")
        .unwrap();
    let index = String::from_utf8_lossy(&index);
    assert!(index.contains(&format!(r#"href="{}_/css/site.css""#, prefix)));
    assert!(index.contains(&format!(r#"src="{}_/img/logo.png""#, prefix)));

    let css = storage
        .read_raw(&outcome.host, &outcome.timestamp, "_/css/site.css")
        .unwrap();
    assert!(String::from_utf8_lossy(&css).contains(&format!("url({}_/img/bg.png)", prefix)));

    // Binary assets are stored byte for byte
    let logo = storage
        .read_raw(&outcome.host, &outcome.timestamp, "_/img/logo.png")
        .unwrap();
    assert_eq!(logo, png);
}

#[tokio::test]
async fn test_repeated_captures_get_distinct_timestamps() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<html><body><img src="/a.png"></body></html>"#).await;
    mount_raw(&server, "/a.png", b"png-bytes", "image/png").await;

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();
    let seed = format!("{}/", server.uri());

    let first = pipeline.run(TriggerRequest::new(seed.clone())).await.unwrap();
    let second = pipeline.run(TriggerRequest::new(seed.clone())).await.unwrap();
    assert_ne!(first.timestamp, second.timestamp);

    let storage = pipeline.storage();
    let seed_url = url::Url::parse(&seed).unwrap();
    let listed = storage.list_by_host(&seed_url).unwrap();
    assert_eq!(listed, vec![first.timestamp.clone(), second.timestamp.clone()]);

    // Recording an existing capture again leaves the manifest unchanged
    storage.record(&seed_url, &first.timestamp).unwrap();
    assert_eq!(storage.manifest().unwrap().get(&first.host).map(Vec::len), Some(2));

    let diff = storage
        .diff(&first.host, &first.timestamp, &second.timestamp)
        .unwrap();
    assert!(diff.unchanged.contains(&"_/a.png".to_string()));
    assert!(diff.added.is_empty());
    assert!(diff.removed.is_empty());
}

#[tokio::test]
async fn test_capture_reports_progress() {
    let server = MockServer::start().await;
    mount_html(&server, "/", r#"<html><body><a href="/next">Next</a></body></html>"#).await;
    mount_html(&server, "/next", "<html><body>next</body></html>").await;

    let data_dir = TempDir::new().unwrap();
    let registry = ProgressRegistry::new();
    let pipeline = Pipeline::open(create_test_config(&data_dir), registry.clone()).unwrap();

    let mut events = registry.subscribe("job-1");
    let outcome = pipeline
        .run(
            TriggerRequest::new(format!("{}/", server.uri()))
                .with_max_pages(10)
                .with_progress_id("job-1"),
        )
        .await
        .unwrap();

    // The subscription is dropped when the capture ends, closing the stream
    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }
    assert!(!registry.is_subscribed("job-1"));

    let crawl: Vec<_> = received
        .iter()
        .filter(|e| e.phase == ProgressPhase::Crawl)
        .collect();
    let save: Vec<_> = received
        .iter()
        .filter(|e| e.phase == ProgressPhase::Save)
        .collect();

    assert_eq!(crawl.len(), 2);
    assert_eq!(save.len(), outcome.resource_count);
    // Every event is measured against the page budget
    assert!(received.iter().all(|e| e.total == 10));
    assert_eq!(save.last().unwrap().page_count, 2);
}

#[tokio::test]
async fn test_capture_follows_seed_redirect_to_other_origin() {
    let old_site = MockServer::start().await;
    let new_site = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/", new_site.uri()).as_str()),
        )
        .mount(&old_site)
        .await;
    mount_html(&new_site, "/", r#"<a href="/about">a</a><img src="/i.png">"#).await;
    mount_html(&new_site, "/about", "<html><body>About us</body></html>").await;
    mount_raw(&new_site, "/i.png", b"png-bytes", "image/png").await;

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();

    let outcome = pipeline
        .run(TriggerRequest::new(format!("{}/", old_site.uri())))
        .await
        .unwrap();

    // The snapshot belongs to the requested host but holds the site it landed on
    assert_eq!(outcome.host, server_host(&old_site));
    assert_eq!(outcome.resource_count, 3);

    let storage = pipeline.storage();
    let index = storage
        .read_raw(&outcome.host, &outcome.timestamp, "index.html")
        .unwrap();
    let index = String::from_utf8_lossy(&index);
    assert!(index.contains(&format!(r#"href="{}_/about""#, outcome.base_prefix)));
    assert!(index.contains(&format!(r#"src="{}_/i.png""#, outcome.base_prefix)));

    let about = storage
        .read_raw(&outcome.host, &outcome.timestamp, "_/about")
        .unwrap();
    assert!(String::from_utf8_lossy(&about).contains("About us"));
    assert_eq!(
        storage
            .read_raw(&outcome.host, &outcome.timestamp, "_/i.png")
            .unwrap(),
        b"png-bytes"
    );
}

#[tokio::test]
async fn test_unreachable_seed_records_nothing() {
    let server = MockServer::start().await;
    // No routes mounted: every request is answered with 404

    let data_dir = TempDir::new().unwrap();
    let pipeline = Pipeline::open(create_test_config(&data_dir), ProgressRegistry::new()).unwrap();

    let result = pipeline
        .run(TriggerRequest::new(format!("{}/", server.uri())))
        .await;
    assert!(result.is_err());
    assert!(pipeline.storage().manifest().unwrap().is_empty());
}

#[cfg(not(feature = "browser"))]
#[tokio::test]
async fn test_browser_strategy_falls_back_to_http() {
    let server = MockServer::start().await;
    mount_html(&server, "/", "<html><body>fallback</body></html>").await;

    let data_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&data_dir);
    config.crawler.strategy = FetchStrategy::Browser;
    config.crawler.fallback = true;
    let pipeline = Pipeline::open(config, ProgressRegistry::new()).unwrap();

    let outcome = pipeline
        .run(TriggerRequest::new(format!("{}/", server.uri())))
        .await
        .unwrap();

    assert_eq!(outcome.strategy, Some(FetchStrategy::Http));
    assert_eq!(outcome.resource_count, 1);
}
