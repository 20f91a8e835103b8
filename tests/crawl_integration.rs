//! Integration tests for the pagination loop.
//!
//! Pages come from a scripted `PageSource`; images go through a recording
//! fetcher so download attempts can be counted exactly. The last tests use
//! `SearchClient` against a mock search endpoint.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use harvester_core::{
    BoundedDownloader, CrawlError, CrawlOptions, Crawler, DedupIndex, DownloadError, FetchError,
    ImageFetch, PageSource, RunCounters, SearchClient,
};
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ==================== Fakes ====================

/// Serves canned bodies by page number; unknown pages return a 500.
struct ScriptedPages {
    pages: HashMap<u32, String>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedPages {
    fn new(pages: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedPages {
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(page);
        self.pages
            .get(&page)
            .cloned()
            .ok_or_else(|| FetchError::http_status(format!("https://s.test/q?page={page}"), page, 500))
    }
}

/// Counts attempts; stalls forever on URLs containing "stall".
#[derive(Default)]
struct RecordingFetch {
    attempts: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageFetch for RecordingFetch {
    async fn fetch_into(
        &self,
        url: &str,
        file: &mut File,
        path: &Path,
    ) -> Result<u64, DownloadError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        file.write_all(b"img")
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        if url.contains("stall") {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(3)
    }
}

// ==================== Helpers ====================

/// Builds a search page body with one `img` per URL.
fn page_body(urls: &[String]) -> String {
    let imgs: String = urls
        .iter()
        .map(|u| format!("<article><img srcset=\"{u}?auto=compress&w=500 1x, {u}?w=1000 2x\"></article>"))
        .collect();
    format!("$('.photos').insertAdjacentHTML('beforeend', '{imgs}');")
}

fn image_urls(prefix: &str, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("https://images.test/photos/{prefix}-{i}.jpeg"))
        .collect()
}

fn options(dest: &Path, delay: Duration) -> CrawlOptions {
    CrawlOptions {
        start_page: 1,
        page_delay: delay,
        max_pages: None,
        dest_dir: dest.to_path_buf(),
    }
}

fn downloader(
    fetcher: &Arc<RecordingFetch>,
    target: usize,
    timeout: Duration,
) -> BoundedDownloader {
    BoundedDownloader::new(
        3,
        timeout,
        Arc::clone(fetcher) as Arc<dyn ImageFetch>,
        Arc::new(RunCounters::new(target)),
    )
    .unwrap()
}

// ==================== Scenarios ====================

#[tokio::test]
async fn test_crawl_skips_cached_and_stops_after_one_page() {
    let temp_dir = TempDir::new().unwrap();
    let urls = image_urls("p", 7);
    let source = ScriptedPages::new([(1, page_body(&urls)), (2, page_body(&image_urls("q", 7)))]);
    let index = DedupIndex::from_identifiers(["p-2", "p-5"]);
    let fetcher = Arc::new(RecordingFetch::default());
    let engine = downloader(&fetcher, 5, Duration::from_secs(5));

    let crawler = Crawler::new(
        &source,
        &index,
        &engine,
        options(temp_dir.path(), Duration::from_millis(10)),
    );
    let summary = crawler.run().await.unwrap();

    assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 5);
    assert_eq!(source.requested(), vec![1]);
    assert_eq!(summary.saved, 5);
    assert_eq!(summary.skipped_cached, 2);
    assert_eq!(summary.pages_fetched, 1);
    assert!(summary.target_reached);

    let fetched = fetcher.urls.lock().unwrap().clone();
    assert!(!fetched.iter().any(|u| u.contains("p-2") || u.contains("p-5")));
    assert!(temp_dir.path().join("p-1.jpeg").exists());
    assert!(!temp_dir.path().join("p-2.jpeg").exists());
}

#[tokio::test]
async fn test_crawl_empty_page_continues_after_delay() {
    let temp_dir = TempDir::new().unwrap();
    let source = ScriptedPages::new([
        (1, "<html><body>nothing here</body></html>".to_string()),
        (2, page_body(&image_urls("n", 3))),
    ]);
    let index = DedupIndex::default();
    let fetcher = Arc::new(RecordingFetch::default());
    let engine = downloader(&fetcher, 3, Duration::from_secs(5));
    let delay = Duration::from_millis(150);

    let started = Instant::now();
    let summary = Crawler::new(&source, &index, &engine, options(temp_dir.path(), delay))
        .run()
        .await
        .unwrap();

    assert!(started.elapsed() >= delay, "page delay was not observed");
    assert_eq!(source.requested(), vec![1, 2]);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.last_page, Some(2));
    assert_eq!(summary.saved, 3);
}

#[tokio::test]
async fn test_crawl_last_page_may_overshoot_target() {
    let temp_dir = TempDir::new().unwrap();
    let source = ScriptedPages::new([(1, page_body(&image_urls("o", 6)))]);
    let index = DedupIndex::default();
    let fetcher = Arc::new(RecordingFetch::default());
    let engine = downloader(&fetcher, 2, Duration::from_secs(5));

    let summary = Crawler::new(
        &source,
        &index,
        &engine,
        options(temp_dir.path(), Duration::ZERO),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.saved, 6);
    assert_eq!(source.requested(), vec![1]);
}

#[tokio::test]
async fn test_crawl_timed_out_image_is_excluded() {
    let temp_dir = TempDir::new().unwrap();
    let mut urls = image_urls("t", 2);
    urls.push("https://images.test/photos/stall-1.jpeg".to_string());
    let source = ScriptedPages::new([(1, page_body(&urls)), (2, page_body(&image_urls("u", 1)))]);
    let index = DedupIndex::default();
    let fetcher = Arc::new(RecordingFetch::default());
    let engine = downloader(&fetcher, 3, Duration::from_millis(100));

    let summary = Crawler::new(
        &source,
        &index,
        &engine,
        options(temp_dir.path(), Duration::ZERO),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.saved, 3);
    assert_eq!(source.requested(), vec![1, 2]);
    assert!(!temp_dir.path().join("stall-1.jpeg").exists());
}

#[tokio::test]
async fn test_crawl_page_fetch_error_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let source = ScriptedPages::new([(1, page_body(&image_urls("f", 1)))]);
    let index = DedupIndex::default();
    let fetcher = Arc::new(RecordingFetch::default());
    let engine = downloader(&fetcher, 5, Duration::from_secs(5));

    let result = Crawler::new(
        &source,
        &index,
        &engine,
        options(temp_dir.path(), Duration::ZERO),
    )
    .run()
    .await;

    match result {
        Err(CrawlError::Fetch { page, .. }) => assert_eq!(page, 2),
        other => panic!("expected fetch error on page 2, got {other:?}"),
    }
    assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_crawl_respects_max_pages() {
    let temp_dir = TempDir::new().unwrap();
    let source = ScriptedPages::new((3..=10).map(|p| (p, String::new())));
    let index = DedupIndex::default();
    let fetcher = Arc::new(RecordingFetch::default());
    let engine = downloader(&fetcher, 1, Duration::from_secs(5));

    let mut opts = options(temp_dir.path(), Duration::ZERO);
    opts.start_page = 3;
    opts.max_pages = Some(2);
    let summary = Crawler::new(&source, &index, &engine, opts)
        .run()
        .await
        .unwrap();

    assert_eq!(source.requested(), vec![3, 4]);
    assert_eq!(summary.saved, 0);
    assert!(!summary.target_reached);
}

#[tokio::test]
async fn test_crawl_stops_on_shared_counter_target() {
    let temp_dir = TempDir::new().unwrap();
    let source = ScriptedPages::new([
        (1, page_body(&image_urls("s", 1))),
        (2, page_body(&image_urls("r", 5))),
    ]);
    let index = DedupIndex::default();
    let counters = Arc::new(RunCounters::new(3));
    counters.record_saved();
    counters.record_saved();
    let engine = BoundedDownloader::new(
        2,
        Duration::from_secs(5),
        Arc::new(RecordingFetch::default()),
        Arc::clone(&counters),
    )
    .unwrap();

    let summary = Crawler::new(
        &source,
        &index,
        &engine,
        options(temp_dir.path(), Duration::ZERO),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(source.requested(), vec![1]);
    assert_eq!(summary.saved, 1);
    assert_eq!(counters.saved(), 3);
    assert!(summary.target_reached);
}

// ==================== SearchClient ====================

#[tokio::test]
async fn test_search_client_requests_paged_js_format() {
    let mock_server = MockServer::start().await;
    let body = page_body(&image_urls("w", 2));

    Mock::given(method("GET"))
        .and(path("/search/red%20fox"))
        .and(query_param("format", "js"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SearchClient::new(&format!("{}/search", mock_server.uri()), "red fox").unwrap();
    let fetched = client.fetch_page(4).await.unwrap();

    assert_eq!(fetched, body);
    assert_eq!(harvester_core::extract_images(&fetched).len(), 2);
}

#[tokio::test]
async fn test_search_client_error_status_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = SearchClient::new(&format!("{}/search", mock_server.uri()), "cats").unwrap();
    let result = client.fetch_page(1).await;

    assert!(matches!(
        result,
        Err(FetchError::HttpStatus { status: 503, page: 1, .. })
    ));
}
