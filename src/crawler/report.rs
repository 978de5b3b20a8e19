//! Outcome of a crawl run

use crate::fetcher::FetchFailure;
use crate::record::Identifier;
use chrono::{DateTime, Duration, Utc};

/// An identifier whose fetch failed during this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFetch {
    pub identifier: Identifier,
    pub reason: FetchFailure,
}

/// An identifier whose record could not be persisted during this run
///
/// The identifier was fetched successfully but is not in the ledger, so the
/// next run will fetch it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFailure {
    pub identifier: Identifier,
    pub message: String,
}

/// Aggregated result of one coordinator run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Number of workers that ran
    pub workers: usize,

    /// Identifiers handed out by the source
    pub pulled: usize,

    /// Identifiers skipped because a previous run completed them
    pub skipped: usize,

    /// Identifiers persisted and recorded in the ledger during this run
    pub completed: usize,

    /// Fetch failures, each identifier exactly once, sorted by identifier
    pub fetch_failures: Vec<FailedFetch>,

    /// Persist failures, sorted by identifier
    pub persist_failures: Vec<PersistFailure>,
}

impl CrawlReport {
    /// Identifiers whose fetch failed, in report order
    pub fn failed_identifiers(&self) -> Vec<Identifier> {
        self.fetch_failures
            .iter()
            .map(|failure| failure.identifier.clone())
            .collect()
    }

    /// True when every pulled identifier was either completed or skipped
    pub fn is_clean(&self) -> bool {
        self.fetch_failures.is_empty() && self.persist_failures.is_empty()
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> Duration {
        self.finished_at - self.started_at
    }

    /// Counts fetch failures by kind as `(not_reachable, content_not_found)`
    pub fn failure_breakdown(&self) -> (usize, usize) {
        self.fetch_failures
            .iter()
            .fold((0, 0), |(unreachable, missing), failure| match failure.reason {
                FetchFailure::NotReachable(_) => (unreachable + 1, missing),
                FetchFailure::ContentNotFound(_) => (unreachable, missing + 1),
            })
    }
}
