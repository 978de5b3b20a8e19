//! Fetch-and-extract collaborators
//!
//! The coordinator only depends on the [`Fetcher`] contract: turn an
//! identifier into a [`Record`] or a typed [`FetchFailure`]. How the page is
//! retrieved and what is extracted from it is up to the implementation.

mod extract;
mod http;

pub use extract::{extract_display_name, parse_selector};
pub use http::{build_http_client, HttpFetcher};

use crate::record::{Identifier, Record};
use async_trait::async_trait;
use thiserror::Error;

/// Why an identifier could not be turned into a record
///
/// Implementations must normalise every fault, including timeouts, into one
/// of these variants rather than panicking or returning other errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// The resource could not be retrieved (network, timeout, HTTP status)
    #[error("not reachable: {0}")]
    NotReachable(String),

    /// The resource was retrieved but the expected content was missing
    #[error("content not found: {0}")]
    ContentNotFound(String),
}

/// Turns an identifier into a structured record
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `id` and extracts its record
    async fn fetch(&self, id: &Identifier) -> Result<Record, FetchFailure>;
}
