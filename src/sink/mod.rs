//! Record sinks
//!
//! A sink durably persists one record per successfully fetched identifier.
//! The coordinator only marks an identifier done after the sink returns
//! `Ok`, so an implementation must not report success before the record is
//! safely on storage.

mod file;

pub use file::FileSink;

use crate::record::Record;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting a record
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write record to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Record cannot be persisted: {0}")]
    InvalidRecord(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Durable destination for extracted records
///
/// Writes for distinct identifiers must be independent of each other;
/// callers do not synchronise between workers.
pub trait RecordSink: Send + Sync {
    /// Persists `record`, returning where it was stored
    fn persist(&self, record: &Record) -> SinkResult<PathBuf>;
}
