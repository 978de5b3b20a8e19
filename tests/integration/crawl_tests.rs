//! Integration tests for the crawl coordinator
//!
//! These tests drive the public API end to end: file-backed input lists,
//! the on-disk ledger, the file sink, and either an instrumented fetcher or
//! the HTTP fetcher against a wiremock server.

use async_trait::async_trait;
use ledger_crawl::config::{Config, CrawlerConfig, FetcherConfig, InputConfig, OutputConfig};
use ledger_crawl::crawler::{crawl, run_crawl};
use ledger_crawl::sink::SinkResult;
use ledger_crawl::{
    CrawlError, FetchFailure, Fetcher, FileSink, FileSource, Identifier, MemorySource, Record,
    RecordSink, SinkError, SuccessLedger,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher that records every call and fails a chosen set of identifiers
#[derive(Default)]
struct ScriptedFetcher {
    calls: Mutex<HashMap<String, usize>>,
    failing: HashSet<String>,
}

impl ScriptedFetcher {
    fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    fn fetched(&self) -> HashSet<String> {
        self.calls.lock().unwrap().keys().cloned().collect()
    }

    fn counts(&self) -> HashMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, id: &Identifier) -> Result<Record, FetchFailure> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(id.as_str().to_string())
            .or_default() += 1;

        // Yield so workers genuinely interleave
        tokio::task::yield_now().await;

        if self.failing.contains(id.as_str()) {
            return Err(FetchFailure::ContentNotFound("scripted".to_string()));
        }
        Ok(Record::new(
            id.clone(),
            format!("Name {}", id.output_stem()),
            format!("<html>{}</html>", id),
        ))
    }
}

/// Sink that fails for a chosen set of identifiers
struct FailingSink {
    inner: FileSink,
    failing: HashSet<String>,
}

impl RecordSink for FailingSink {
    fn persist(&self, record: &Record) -> SinkResult<PathBuf> {
        if self.failing.contains(record.identifier.as_str()) {
            return Err(SinkError::Io {
                path: self.inner.record_path(record),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected"),
            });
        }
        self.inner.persist(record)
    }
}

/// Sink that keeps records in memory and counts writes per identifier
#[derive(Default)]
struct MemorySink {
    writes: Mutex<HashMap<String, usize>>,
}

impl RecordSink for MemorySink {
    fn persist(&self, record: &Record) -> SinkResult<PathBuf> {
        *self
            .writes
            .lock()
            .unwrap()
            .entry(record.identifier.as_str().to_string())
            .or_default() += 1;
        Ok(PathBuf::from(format!("{}.txt", record.identifier.output_stem())))
    }
}

fn write_input(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("input.csv");
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(&path, content).unwrap();
    path
}

fn ledger_entries(path: &Path) -> HashSet<String> {
    SuccessLedger::load(path)
        .unwrap()
        .entries
        .into_iter()
        .map(Identifier::into_inner)
        .collect()
}

fn set(values: &[&str]) -> HashSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_to_end_and_rerun() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let ledger_path = out.join(".crawl-ledger");
    let input = write_input(
        dir.path(),
        &["\"a.com/1\"".into(), "a.com/2".into(), " a.com/3 ".into()],
    );

    // First run: 2 fails
    let fetcher = Arc::new(ScriptedFetcher::failing(&["a.com/2"]));
    let report = run_crawl(
        Arc::new(FileSource::open(&input).unwrap()),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        fetcher.clone(),
        Arc::new(FileSink::new(&out).unwrap()),
        3,
    )
    .await
    .unwrap();

    assert_eq!(
        report.failed_identifiers(),
        vec![Identifier::new("a.com/2")]
    );
    assert_eq!(ledger_entries(&ledger_path), set(&["a.com/1", "a.com/3"]));

    let mut outputs: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".txt"))
        .collect();
    outputs.sort();
    assert_eq!(outputs, vec!["1.txt".to_string(), "3.txt".to_string()]);

    let text = std::fs::read_to_string(out.join("1.txt")).unwrap();
    assert_eq!(text, "a.com/1\nName 1\n<html>a.com/1</html>");

    // Second run over the same input and surviving ledger
    let fetcher = Arc::new(ScriptedFetcher::default());
    let report = run_crawl(
        Arc::new(FileSource::open(&input).unwrap()),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        fetcher.clone(),
        Arc::new(FileSink::new(&out).unwrap()),
        3,
    )
    .await
    .unwrap();

    assert_eq!(fetcher.fetched(), set(&["a.com/2"]));
    assert_eq!(report.skipped, 2);
    assert_eq!(report.completed, 1);
    assert!(report.is_clean());
    assert_eq!(
        ledger_entries(&ledger_path),
        set(&["a.com/1", "a.com/2", "a.com/3"])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resume_after_crash_never_refetches() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let ledger_path = out.join(".crawl-ledger");
    let lines: Vec<String> = (0..200).map(|i| format!("https://a.com/u/{}", i)).collect();
    let input = write_input(dir.path(), &lines);

    // A run that was killed after its first 120 completions
    let first = Arc::new(ScriptedFetcher::default());
    run_crawl(
        Arc::new(MemorySource::new(&lines[..120])),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        first.clone(),
        Arc::new(FileSink::new(&out).unwrap()),
        8,
    )
    .await
    .unwrap();

    // The kill also tore the next ledger append
    {
        use std::io::Write;
        let mut log = std::fs::OpenOptions::new()
            .append(true)
            .open(&ledger_path)
            .unwrap();
        log.write_all(b"https://a.com/u/1").unwrap();
    }

    let second = Arc::new(ScriptedFetcher::default());
    let report = run_crawl(
        Arc::new(FileSource::open(&input).unwrap()),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        second.clone(),
        Arc::new(FileSink::new(&out).unwrap()),
        8,
    )
    .await
    .unwrap();

    let refetched: HashSet<String> = second.fetched();
    let expected: HashSet<String> = lines[120..].iter().cloned().collect();
    assert_eq!(refetched, expected);
    assert_eq!(report.skipped, 120);
    assert_eq!(report.completed, 80);

    // The torn prefix "https://a.com/u/1" must not shadow a real entry
    let entries = ledger_entries(&ledger_path);
    assert_eq!(entries.len(), 200);
    assert_eq!(entries, lines.iter().cloned().collect::<HashSet<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_no_duplicate_delivery_across_worker_counts() {
    let lines: Vec<String> = (0..1000).map(|i| format!("https://a.com/item/{}", i)).collect();

    for workers in 1..=50 {
        let dir = TempDir::new().unwrap();
        let input = write_input(dir.path(), &lines);
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(MemorySink::default());

        let report = run_crawl(
            Arc::new(FileSource::open(&input).unwrap()),
            Arc::new(SuccessLedger::open(&dir.path().join(".crawl-ledger")).unwrap()),
            fetcher.clone(),
            sink.clone(),
            workers,
        )
        .await
        .unwrap();

        let counts = fetcher.counts();
        assert_eq!(counts.len(), 1000, "workers = {}", workers);
        assert!(
            counts.values().all(|c| *c == 1),
            "duplicate fetch with {} workers",
            workers
        );
        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 1000, "workers = {}", workers);
        assert!(writes.values().all(|c| *c == 1));
        assert_eq!(report.pulled, 1000);
        assert_eq!(report.completed, 1000);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_persist_failure_never_reaches_ledger() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let ledger_path = out.join(".crawl-ledger");
    let lines: Vec<String> = (0..30).map(|i| format!("a.com/{}", i)).collect();

    let failing: HashSet<String> = ["a.com/3", "a.com/17", "a.com/29"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let sink = Arc::new(FailingSink {
        inner: FileSink::new(&out).unwrap(),
        failing: failing.clone(),
    });

    let report = run_crawl(
        Arc::new(MemorySource::new(&lines)),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        Arc::new(ScriptedFetcher::default()),
        sink,
        6,
    )
    .await
    .unwrap();

    let persist_failed: HashSet<String> = report
        .persist_failures
        .iter()
        .map(|f| f.identifier.as_str().to_string())
        .collect();
    assert_eq!(persist_failed, failing);
    assert!(report.fetch_failures.is_empty());

    let entries = ledger_entries(&ledger_path);
    assert_eq!(entries.len(), 27);
    for id in &entries {
        assert!(!failing.contains(id));
        let stem = Identifier::new(id.as_str()).output_stem();
        let text = std::fs::read_to_string(out.join(format!("{}.txt", stem))).unwrap();
        let record = Record::from_text(&text).expect("record has three fields");
        assert_eq!(record.identifier.as_str(), id);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_fetch_failure_reported_once() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let ledger_path = out.join(".crawl-ledger");
    let lines: Vec<String> = (0..100).map(|i| format!("a.com/{}", i)).collect();
    let failing: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 7 == 0)
        .map(|(_, id)| id.as_str())
        .collect();

    let report = run_crawl(
        Arc::new(MemorySource::new(&lines)),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        Arc::new(ScriptedFetcher::failing(&failing)),
        Arc::new(FileSink::new(&out).unwrap()),
        10,
    )
    .await
    .unwrap();

    let reported: Vec<String> = report
        .failed_identifiers()
        .into_iter()
        .map(Identifier::into_inner)
        .collect();
    let unique: HashSet<&String> = reported.iter().collect();
    assert_eq!(reported.len(), failing.len());
    assert_eq!(unique.len(), failing.len());

    let entries = ledger_entries(&ledger_path);
    for id in &failing {
        assert!(unique.contains(&id.to_string()));
        assert!(!entries.contains(*id));
    }
    assert_eq!(entries.len(), 100 - failing.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_malformed_input_line_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let ledger_path = out.join(".crawl-ledger");
    let input = dir.path().join("input.csv");
    std::fs::write(&input, b"a.com/1\na.com/x\ty\na.com/4\ra.com/5\n").unwrap();

    let fetcher = Arc::new(ScriptedFetcher::default());
    let report = run_crawl(
        Arc::new(FileSource::open(&input).unwrap()),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        fetcher.clone(),
        Arc::new(FileSink::new(&out).unwrap()),
        1,
    )
    .await
    .expect("a bad input line must not abort the run");

    assert_eq!(report.completed, 3);
    assert!(report.is_clean());
    assert_eq!(fetcher.fetched(), set(&["a.com/1", "a.com/4", "a.com/5"]));
    assert!(!out.join("x_y.txt").exists());

    // The rerun has nothing left to do
    let fetcher = Arc::new(ScriptedFetcher::default());
    let report = run_crawl(
        Arc::new(FileSource::open(&input).unwrap()),
        Arc::new(SuccessLedger::open(&ledger_path).unwrap()),
        fetcher.clone(),
        Arc::new(FileSink::new(&out).unwrap()),
        1,
    )
    .await
    .unwrap();

    assert_eq!(report.skipped, 3);
    assert!(fetcher.fetched().is_empty());
}

fn create_test_config(input: &Path, out: &Path) -> Config {
    Config {
        crawler: CrawlerConfig { workers: 4 },
        input: InputConfig {
            path: input.to_string_lossy().into_owned(),
        },
        output: OutputConfig {
            directory: out.to_string_lossy().into_owned(),
            ledger_file: ".crawl-ledger".to_string(),
        },
        fetcher: FetcherConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            timeout_secs: 5,
            ..FetcherConfig::default()
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for (slug, name) in [("alice", "Alice A."), ("carol", "Carol C.")] {
        Mock::given(method("GET"))
            .and(path(format!("/{}", slug)))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><body><h1 class="page-title__title">{}</h1></body></html>"#,
                name
            )))
            .mount(&mock_server)
            .await;
    }

    // No title element on this one
    Mock::given(method("GET"))
        .and(path("/bob"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("resumes");
    let input = write_input(
        dir.path(),
        &[
            format!("{}/alice", base_url),
            format!("{}/bob", base_url),
            format!("{}/carol", base_url),
        ],
    );
    let config = create_test_config(&input, &out);

    let report = crawl(&config).await.expect("crawl failed");

    assert_eq!(report.completed, 2);
    assert_eq!(
        report.failed_identifiers(),
        vec![Identifier::new(format!("{}/bob", base_url))]
    );
    assert!(matches!(
        report.fetch_failures[0].reason,
        FetchFailure::ContentNotFound(_)
    ));

    let alice = std::fs::read_to_string(out.join("alice.txt")).unwrap();
    let record = Record::from_text(&alice).unwrap();
    assert_eq!(record.display_name, "Alice A.");
    assert!(record.payload.contains("page-title__title"));
    assert!(!out.join("bob.txt").exists());

    // Rerun: only bob is requested again
    let report = crawl(&config).await.expect("rerun failed");
    assert_eq!(report.skipped, 2);
    assert_eq!(report.pulled, 3);
    assert_eq!(report.fetch_failures.len(), 1);

    let requests = mock_server.received_requests().await.unwrap();
    let bob_hits = requests.iter().filter(|r| r.url.path() == "/bob").count();
    let alice_hits = requests.iter().filter(|r| r.url.path() == "/alice").count();
    assert_eq!(bob_hits, 2);
    assert_eq!(alice_hits, 1);
}

#[tokio::test]
async fn test_missing_input_fails_before_any_work() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let config = create_test_config(&dir.path().join("missing.csv"), &out);

    let result = crawl(&config).await;

    assert!(matches!(result, Err(CrawlError::SourceNotFound { .. })));
    assert!(!out.exists(), "no output should be created on startup failure");
}
