//! Crawler coordinator - worker pool orchestration
//!
//! This module runs a fixed pool of workers over a shared identifier source.
//! Each worker repeatedly:
//! - Pulls the next identifier (the source serialises delivery)
//! - Skips identifiers the ledger already holds
//! - Fetches and extracts a record
//! - Persists the record, then marks the identifier done in the ledger
//!
//! Only the source, the ledger and the failure lists are shared, each behind
//! its own lock. Because the source never hands the same line to two
//! workers, the fetch-persist-append sequence needs no lock of its own.

use crate::crawler::report::{CrawlReport, FailedFetch, PersistFailure};
use crate::fetcher::Fetcher;
use crate::ledger::SuccessLedger;
use crate::record::Identifier;
use crate::sink::RecordSink;
use crate::source::IdentifierSource;
use crate::CrawlError;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Completions between progress log lines
const PROGRESS_INTERVAL: usize = 25;

/// Main crawl coordinator structure
pub struct Coordinator {
    source: Arc<dyn IdentifierSource>,
    ledger: Arc<SuccessLedger>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
    workers: usize,
}

/// State shared by all workers of one run
struct WorkerPool {
    source: Arc<dyn IdentifierSource>,
    ledger: Arc<SuccessLedger>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,

    fetch_failures: Mutex<Vec<FailedFetch>>,
    persist_failures: Mutex<Vec<PersistFailure>>,

    pulled: AtomicUsize,
    skipped: AtomicUsize,
    completed: AtomicUsize,

    /// Set when the ledger can no longer be written; workers stop pulling
    halt: AtomicBool,
}

/// What happened to one pulled identifier
enum Outcome {
    Skipped,
    Completed,
    FetchFailed,
    PersistFailed,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `source` - Supplier of identifiers, shared by all workers
    /// * `ledger` - Success ledger, already loaded with prior runs
    /// * `fetcher` - Fetch-and-extract collaborator
    /// * `sink` - Record persistence collaborator
    /// * `workers` - Number of concurrent workers (at least 1 is used)
    pub fn new(
        source: Arc<dyn IdentifierSource>,
        ledger: Arc<SuccessLedger>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn RecordSink>,
        workers: usize,
    ) -> Self {
        Self {
            source,
            ledger,
            fetcher,
            sink,
            workers: workers.max(1),
        }
    }

    /// Runs all workers until the source is exhausted
    ///
    /// Per-identifier failures (fetch or persist) never abort the run; they
    /// are collected in the returned report. A ledger write failure is fatal:
    /// remaining workers stop pulling and the error is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Every worker reached end of input
    /// * `Err(CrawlError)` - The ledger failed or a worker task died
    pub async fn run(self) -> Result<CrawlReport, CrawlError> {
        let started_at = Utc::now();
        tracing::info!(
            "Starting crawl with {} worker(s), {} identifier(s) already completed",
            self.workers,
            self.ledger.len()
        );

        let pool = Arc::new(WorkerPool {
            source: self.source,
            ledger: self.ledger,
            fetcher: self.fetcher,
            sink: self.sink,
            fetch_failures: Mutex::new(Vec::new()),
            persist_failures: Mutex::new(Vec::new()),
            pulled: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            halt: AtomicBool::new(false),
        });

        let mut tasks = JoinSet::new();
        for worker_id in 0..self.workers {
            let pool = pool.clone();
            tasks.spawn(async move { pool.work(worker_id).await });
        }

        let mut fatal: Option<CrawlError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    pool.halt.store(true, Ordering::SeqCst);
                    Err(CrawlError::Worker(e.to_string()))
                }
            };

            if let Err(e) = result {
                tracing::error!("Crawl halted: {}", e);
                fatal.get_or_insert(e);
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        let mut fetch_failures = std::mem::take(
            &mut *pool
                .fetch_failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        fetch_failures.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        let mut persist_failures = std::mem::take(
            &mut *pool
                .persist_failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        persist_failures.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        let report = CrawlReport {
            started_at,
            finished_at: Utc::now(),
            workers: self.workers,
            pulled: pool.pulled.load(Ordering::SeqCst),
            skipped: pool.skipped.load(Ordering::SeqCst),
            completed: pool.completed.load(Ordering::SeqCst),
            fetch_failures,
            persist_failures,
        };

        tracing::info!(
            "Crawl finished: {} completed, {} skipped, {} fetch failure(s), {} persist failure(s) in {}s",
            report.completed,
            report.skipped,
            report.fetch_failures.len(),
            report.persist_failures.len(),
            report.duration().num_seconds()
        );

        Ok(report)
    }
}

impl WorkerPool {
    /// One worker loop; returns when the source is exhausted or the run halts
    async fn work(self: Arc<Self>, worker_id: usize) -> Result<(), CrawlError> {
        tracing::debug!("Worker {} started", worker_id);

        while !self.halt.load(Ordering::SeqCst) {
            // next() always advances the cursor, even for identifiers that
            // turn out to be completed already
            let id = match self.source.next() {
                Some(id) => id,
                None => break,
            };
            self.pulled.fetch_add(1, Ordering::SeqCst);

            match self.process(worker_id, id).await {
                Ok(Outcome::Completed) => {
                    let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % PROGRESS_INTERVAL == 0 {
                        tracing::info!(
                            "Progress: {} completed, {} skipped, {} pulled",
                            done,
                            self.skipped.load(Ordering::SeqCst),
                            self.pulled.load(Ordering::SeqCst)
                        );
                    }
                }
                Ok(Outcome::Skipped) => {
                    self.skipped.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Outcome::FetchFailed) | Ok(Outcome::PersistFailed) => {}
                Err(e) => {
                    self.halt.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        tracing::debug!("Worker {} finished", worker_id);
        Ok(())
    }

    /// Handles a single identifier
    async fn process(&self, worker_id: usize, id: Identifier) -> Result<Outcome, CrawlError> {
        if self.ledger.contains(&id) {
            tracing::debug!("Worker {}: {} already completed, skipping", worker_id, id);
            return Ok(Outcome::Skipped);
        }

        tracing::debug!("Worker {}: fetching {}", worker_id, id);
        let record = match self.fetcher.fetch(&id).await {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!("Fetch failed for {}: {}", id, reason);
                self.fetch_failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(FailedFetch {
                        identifier: id,
                        reason,
                    });
                return Ok(Outcome::FetchFailed);
            }
        };

        let sink = self.sink.clone();
        let persisted = tokio::task::spawn_blocking(move || sink.persist(&record))
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| result.map_err(|e| e.to_string()));

        if let Err(message) = persisted {
            tracing::error!("Persist failed for {}: {}", id, message);
            self.persist_failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(PersistFailure {
                    identifier: id,
                    message,
                });
            return Ok(Outcome::PersistFailed);
        }

        let ledger = self.ledger.clone();
        let appended_id = id.clone();
        tokio::task::spawn_blocking(move || ledger.append(&appended_id))
            .await
            .map_err(|e| CrawlError::Worker(e.to_string()))??;

        tracing::debug!("Worker {}: completed {}", worker_id, id);
        Ok(Outcome::Completed)
    }
}

/// Runs a crawl over the given collaborators
///
/// # Example
///
/// ```no_run
/// use ledger_crawl::crawler::run_crawl;
/// use ledger_crawl::{FileSink, FileSource, HttpFetcher, SuccessLedger};
/// use ledger_crawl::config::FetcherConfig;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = Arc::new(FileSource::open(Path::new("urls.csv"))?);
/// let ledger = Arc::new(SuccessLedger::open(Path::new("out/.crawl-ledger"))?);
/// let fetcher = Arc::new(HttpFetcher::new(&FetcherConfig::default())?);
/// let sink = Arc::new(FileSink::new(Path::new("out"))?);
///
/// let report = run_crawl(source, ledger, fetcher, sink, 8).await?;
/// for id in report.failed_identifiers() {
///     println!("failed: {}", id);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    source: Arc<dyn IdentifierSource>,
    ledger: Arc<SuccessLedger>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
    workers: usize,
) -> Result<CrawlReport, CrawlError> {
    Coordinator::new(source, ledger, fetcher, sink, workers)
        .run()
        .await
}
