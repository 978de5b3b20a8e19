//! Crawler module for resumable, concurrent fetching
//!
//! This module contains the core crawling logic, including:
//! - The worker pool that drains the identifier source
//! - Ledger checks and updates around each fetch
//! - Failure bookkeeping and the final run report

mod coordinator;
mod report;

pub use coordinator::{run_crawl, Coordinator};
pub use report::{CrawlReport, FailedFetch, PersistFailure};

use crate::config::Config;
use crate::fetcher::HttpFetcher;
use crate::ledger::SuccessLedger;
use crate::sink::FileSink;
use crate::source::FileSource;
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete crawl described by a configuration
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the input list (failing fast if it is missing)
/// 2. Prepare the output directory and load the ledger
/// 3. Build the HTTP fetcher
/// 4. Run the worker pool until the input is exhausted
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished; failures are listed in the report
/// * `Err(CrawlError)` - Startup failed or the ledger could not be written
pub async fn crawl(config: &Config) -> Result<CrawlReport, CrawlError> {
    let source = Arc::new(FileSource::open(Path::new(&config.input.path))?);
    let sink = Arc::new(FileSink::new(Path::new(&config.output.directory))?);
    let ledger = Arc::new(SuccessLedger::open(&config.ledger_path())?);
    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);

    run_crawl(
        source,
        ledger,
        fetcher,
        sink,
        config.crawler.workers as usize,
    )
    .await
}
