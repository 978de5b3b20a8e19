//! Ledger-Crawl: a resumable, concurrent crawl coordinator
//!
//! This crate pulls identifiers from an input list, fetches each one with a
//! bounded pool of workers, persists one record per success, and marks it
//! done in a durable ledger so that a re-run never repeats completed work.

pub mod config;
pub mod crawler;
pub mod fetcher;
pub mod ledger;
pub mod record;
pub mod report;
pub mod sink;
pub mod source;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Ledger-Crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input list not found or unreadable: {}: {source}", path.display())]
    SourceNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Output error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Ledger-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{FetchFailure, Fetcher, HttpFetcher};
pub use ledger::SuccessLedger;
pub use record::{Identifier, Record};
pub use sink::{FileSink, RecordSink, SinkError};
pub use source::{FileSource, IdentifierSource, MemorySource};
