//! Integration tests for the archive crawler
//!
//! These tests use wiremock to serve a miniature ship/survey archive and
//! exercise the full crawl cycle end-to-end: listing walk, download,
//! processing handoff, ledger commit, and idempotent resume.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use survey_harvest::config::Config;
use survey_harvest::net;
use survey_harvest::process::{
    ProcessingError, ProcessingOutcome, ProcessingRequest, SurveyProcessor,
};
use survey_harvest::{SurveyLedger, Walker};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Processor double that records every handoff and always succeeds
#[derive(Clone)]
struct RecordingProcessor {
    calls: Arc<Mutex<Vec<ProcessingRequest>>>,
}

impl RecordingProcessor {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SurveyProcessor for RecordingProcessor {
    fn process(&self, request: &ProcessingRequest) -> Result<ProcessingOutcome, ProcessingError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(ProcessingOutcome {
            converted: request.raw_files.clone(),
            export_path: Some(request.output_directory.join("grid.bag")),
        })
    }
}

/// Creates a test configuration pointed at the mock archive
fn create_test_config(server_uri: &str, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.archive.root_url = format!("{}/platforms/ocean/ships/", server_uri);
    config.output.directory = output_dir.display().to_string();
    config.retry.listing_retries = 2;
    config.retry.download_retries = 2;
    config
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn listing(links: &[&str]) -> String {
    let mut body = String::from("<html><body><a href=\"../\">Parent Directory</a>\n");
    for link in links {
        body.push_str(&format!("<a href=\"{}\">{}</a>\n", link, link));
    }
    body.push_str("</body></html>");
    body
}

/// Mounts a one-ship, one-survey archive: alpha/s1 with one wanted file and
/// one ignorable file; `expected_downloads` is verified when the server drops
async fn mount_archive(server: &MockServer, expected_downloads: u64) {
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["alpha/"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/alpha/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["s1/"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/alpha/s1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[
            "0001_a.all.mb58.gz",
            "metadata.xml.gz",
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/alpha/s1/0001_a.all.mb58.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(b"sonar pings")))
        .expect(expected_downloads)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_downloads_processes_and_records() {
    let server = MockServer::start().await;
    mount_archive(&server, 1).await;

    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let processor = RecordingProcessor::new();

    let mut walker = Walker::new(
        config,
        net::build_http_client().unwrap(),
        SurveyLedger::open(output.path()).unwrap(),
        Box::new(processor.clone()),
        None,
    );
    walker.run().await.unwrap();

    // one handoff, carrying the decompressed raw file
    assert_eq!(processor.call_count(), 1);
    let request = processor.calls.lock().unwrap()[0].clone();
    assert_eq!(request.raw_files.len(), 1);
    assert!(request.raw_files[0].ends_with("0001_a.all"));

    // raw data deleted after the successful handoff, processed dir remains
    assert!(!output.path().join("alpha/s1").exists());
    assert!(output.path().join("alpha/s1_processed").exists());

    // one ledger row, lowercased, counting both file kinds
    let ledger = walker.into_ledger();
    let records = ledger.all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ship_name, "alpha");
    assert_eq!(records[0].survey_name, "s1");
    assert_eq!(records[0].downloaded_success_count, 1);
    assert_eq!(records[0].downloaded_error_count, 0);
    assert_eq!(records[0].ignored_count, 1);
    assert!(records[0].grid_path.ends_with("grid.bag"));
    assert!(records[0].is_complete());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_archive(&server, 1).await;

    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let processor = RecordingProcessor::new();

    let mut first = Walker::new(
        config.clone(),
        net::build_http_client().unwrap(),
        SurveyLedger::open(output.path()).unwrap(),
        Box::new(processor.clone()),
        None,
    );
    first.run().await.unwrap();
    drop(first.into_ledger());
    assert_eq!(processor.call_count(), 1);

    // re-run against the persisted ledger: the completed survey is skipped
    // before its listing is even fetched
    let mut second = Walker::new(
        config,
        net::build_http_client().unwrap(),
        SurveyLedger::open(output.path()).unwrap(),
        Box::new(processor.clone()),
        None,
    );
    second.run().await.unwrap();

    assert_eq!(processor.call_count(), 1);
    let records = second.into_ledger().all_records().unwrap();
    assert_eq!(records.len(), 1);
    // the .expect(1) on the file mock verifies no second download happened
}

#[tokio::test]
async fn test_allowed_list_mismatch_skips_survey() {
    let server = MockServer::start().await;
    mount_archive(&server, 0).await;

    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let processor = RecordingProcessor::new();

    let mut walker = Walker::new(
        config,
        net::build_http_client().unwrap(),
        SurveyLedger::open(output.path()).unwrap(),
        Box::new(processor.clone()),
        Some(vec![("beta".to_string(), "other_survey".to_string())]),
    );
    walker.run().await.unwrap();

    assert_eq!(processor.call_count(), 0);
    assert!(walker.into_ledger().all_records().unwrap().is_empty());
    assert!(!output.path().join("alpha").exists());
}

#[tokio::test]
async fn test_failed_downloads_are_counted_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["alpha/"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/alpha/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["s1/"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/alpha/s1/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing(&["0001_a.all.mb58.gz"])),
        )
        .mount(&server)
        .await;
    // the file itself is gone from the archive
    Mock::given(method("GET"))
        .and(path("/platforms/ocean/ships/alpha/s1/0001_a.all.mb58.gz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let output = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let processor = RecordingProcessor::new();

    let mut walker = Walker::new(
        config,
        net::build_http_client().unwrap(),
        SurveyLedger::open(output.path()).unwrap(),
        Box::new(processor.clone()),
        None,
    );
    walker.run().await.unwrap();

    // no raw data accumulated, so no handoff, but the row is still written
    assert_eq!(processor.call_count(), 0);
    let records = walker.into_ledger().all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].downloaded_success_count, 0);
    assert_eq!(records[0].downloaded_error_count, 1);
    assert!(!records[0].is_complete());
}
