//! End-to-end runs of the pipeline against in-memory feeds

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing_test::traced_test;

use epg_filter::config::{Config, SelectionConfig, SelectionMode, SourceErrorPolicy};
use epg_filter::errors::{AppError, FetchError};
use epg_filter::pipeline::{EpgPipeline, SourceOutcome};
use epg_filter::utils::FeedFetcher;
use epg_filter::xmltv;

enum Reply {
    Body(Vec<u8>),
    Delayed(Vec<u8>, Duration),
    Status(u16),
}

/// Serves canned replies keyed by URL and records every request
#[derive(Default)]
struct StubFetcher {
    replies: HashMap<String, Reply>,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.replies.get(url) {
            Some(Reply::Body(body)) => Ok(Bytes::from(body.clone())),
            Some(Reply::Delayed(body, delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(Bytes::from(body.clone()))
            }
            Some(Reply::Status(code)) => Err(FetchError::status(url, *code, "Not Found")),
            None => Err(FetchError::new(url, "connection refused")),
        }
    }
}

// Lets a test hand the pipeline a borrow and inspect requests afterwards
#[async_trait]
impl FeedFetcher for &StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

const FEED_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="8"><display-name>Sony SAB</display-name></channel>
  <channel id="51"><display-name>Colors</display-name></channel>
  <programme channel="8" start="20240101060000 +0530"><title>Morning Show</title></programme>
  <programme channel="51" start="20240101060000 +0530"><title>Bigg Boss</title></programme>
</tv>"#;

const FEED_B: &str = r#"<tv>
  <channel id="8"><display-name>Sony SAB HD</display-name></channel>
  <programme channel="8" start="20240101070000 +0530"><title>Evening Show</title></programme>
</tv>"#;

const URL_A: &str = "https://a.example.com/epg.xml.gz";
const URL_B: &str = "https://b.example.com/epg.xml.gz";
const URL_MISSING: &str = "https://missing.example.com/epg.xml.gz";

fn config(sources: &[&str], output: &Path) -> Config {
    Config {
        sources: sources.iter().map(|s| s.to_string()).collect(),
        selection: Some(SelectionConfig {
            mode: SelectionMode::Id,
            values: vec!["8".to_string()],
        }),
        output_path: output.to_path_buf(),
        ..Config::default()
    }
}

fn titles(path: &Path) -> Vec<String> {
    let document = xmltv::parse(&std::fs::read(path).unwrap()).unwrap();
    document.programmes().filter_map(|p| p.title()).collect()
}

fn display_names(path: &Path) -> Vec<String> {
    let document = xmltv::parse(&std::fs::read(path).unwrap()).unwrap();
    document.channels().flat_map(|c| c.display_names()).collect()
}

#[tokio::test]
async fn test_single_source_success() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default().with(URL_A, Reply::Body(gzip(FEED_A)));

    let report = EpgPipeline::new(config(&[URL_A], &output), &fetcher)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.channels_written(), 1);
    assert_eq!(report.programmes_written(), 1);
    assert_eq!(report.skipped_sources(), 0);
    assert_eq!(titles(&output), vec!["Morning Show"]);
}

#[tokio::test]
async fn test_single_source_failure_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default().with(URL_MISSING, Reply::Status(404));

    let err = EpgPipeline::new(config(&[URL_MISSING], &output), &fetcher)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert!(err.to_string().contains("missing.example.com"));
    assert!(err.to_string().contains("404"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_corrupt_gzip_is_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let mut truncated = gzip(FEED_A);
    truncated.truncate(truncated.len() / 2);
    let fetcher = StubFetcher::default().with(URL_A, Reply::Body(truncated));

    let err = EpgPipeline::new(config(&[URL_A], &output), &fetcher)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Source { .. }));
    assert_eq!(err.stage(), "decode");
    assert!(!output.exists());
}

#[tokio::test]
async fn test_failed_run_leaves_previous_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    std::fs::write(&output, "previous run").unwrap();
    let fetcher = StubFetcher::default().with(URL_A, Reply::Body(gzip("<tv><channel id=\"8\">")));

    let err = EpgPipeline::new(config(&[URL_A], &output), &fetcher)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "parse");
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous run");
}

#[tokio::test]
async fn test_multiple_sources_skip_failures_and_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default()
        .with(URL_A, Reply::Body(gzip(FEED_A)))
        .with(URL_MISSING, Reply::Status(404))
        .with(URL_B, Reply::Body(gzip(FEED_B)));

    let report = EpgPipeline::new(config(&[URL_A, URL_MISSING, URL_B], &output), &fetcher)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.skipped_sources(), 1);
    assert!(matches!(
        report.sources[1].outcome,
        SourceOutcome::Skipped { stage: "fetch", .. }
    ));
    // Duplicate channel ids across sources are both kept
    assert_eq!(display_names(&output), vec!["Sony SAB", "Sony SAB HD"]);
    assert_eq!(titles(&output), vec!["Morning Show", "Evening Show"]);
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default()
        .with(URL_MISSING, Reply::Status(404))
        .with(URL_A, Reply::Body(gzip(FEED_A)));
    let mut config = config(&[URL_MISSING, URL_A], &output);
    config.on_source_error = SourceErrorPolicy::Abort;

    let err = EpgPipeline::new(config, &fetcher).unwrap().run().await.unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert_eq!(fetcher.requested(), vec![URL_MISSING]);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_require_all_sources_refuses_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default()
        .with(URL_A, Reply::Body(gzip(FEED_A)))
        .with(URL_MISSING, Reply::Status(404));
    let mut config = config(&[URL_A, URL_MISSING], &output);
    config.require_all_sources = true;

    let err = EpgPipeline::new(config, &fetcher).unwrap().run().await.unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert!(!output.exists());
}

#[tokio::test]
async fn test_every_source_failing_writes_empty_guide() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default();
    let mut config = config(&[URL_A, URL_B], &output);
    config.on_source_error = SourceErrorPolicy::Skip;

    let report = EpgPipeline::new(config, &fetcher).unwrap().run().await.unwrap();

    assert_eq!(report.skipped_sources(), 2);
    let document = xmltv::parse(&std::fs::read(&output).unwrap()).unwrap();
    assert!(document.is_empty());
}

#[tokio::test]
async fn test_concurrent_fetch_keeps_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default()
        .with(URL_A, Reply::Delayed(gzip(FEED_A), Duration::from_millis(100)))
        .with(URL_B, Reply::Body(gzip(FEED_B)));
    let mut config = config(&[URL_A, URL_B], &output);
    config.concurrent_fetch = true;

    EpgPipeline::new(config, &fetcher).unwrap().run().await.unwrap();

    assert_eq!(fetcher.requested().len(), 2);
    assert_eq!(titles(&output), vec!["Morning Show", "Evening Show"]);
}

#[tokio::test]
async fn test_name_selection_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default()
        .with(URL_A, Reply::Body(gzip(FEED_A)))
        .with(URL_B, Reply::Body(gzip(FEED_B)));
    let mut config = config(&[URL_A, URL_B], &output);
    config.selection = Some(SelectionConfig {
        mode: SelectionMode::Name,
        values: vec!["Colors".to_string()],
    });

    let report = EpgPipeline::new(config, &fetcher).unwrap().run().await.unwrap();

    assert_eq!(report.channels_written(), 1);
    assert_eq!(titles(&output), vec!["Bigg Boss"]);
}

#[tokio::test]
async fn test_download_dir_keeps_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let downloads = dir.path().join("downloads");
    std::fs::create_dir(&downloads).unwrap();
    let fetcher = StubFetcher::default().with(URL_A, Reply::Body(gzip(FEED_A)));
    let mut config = config(&[URL_A], &output);
    config.download_dir = Some(downloads.clone());

    EpgPipeline::new(config, &fetcher).unwrap().run().await.unwrap();

    assert!(downloads.join("source_1.xml.gz").exists());
    assert_eq!(
        std::fs::read_to_string(downloads.join("source_1.xml")).unwrap(),
        FEED_A
    );
}

#[test]
fn test_invalid_config_fails_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = StubFetcher::default();
    let mut config = config(&["ftp://example.com/epg.xml.gz"], &dir.path().join("out.xml"));

    assert!(matches!(
        EpgPipeline::new(config.clone(), &fetcher),
        Err(AppError::Config(_))
    ));

    config.sources = vec![URL_A.to_string()];
    config.selection = None;
    assert!(matches!(EpgPipeline::new(config, &fetcher), Err(AppError::Config(_))));
    assert!(fetcher.requested().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_run_logs_summary() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("filtered_epg.xml");
    let fetcher = StubFetcher::default()
        .with(URL_A, Reply::Body(gzip(FEED_A)))
        .with(URL_MISSING, Reply::Status(404));

    EpgPipeline::new(config(&[URL_A, URL_MISSING], &output), &fetcher)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(logs_contain("Filter complete. Added 1 channels and 1 programmes."));
    assert!(logs_contain("Output file created:"));
    assert!(logs_contain("Skipping source https://missing.example.com/epg.xml.gz after fetch failure"));
}
