//! HTTP fetcher implementation
//!
//! This module fetches pages with reqwest and extracts the display name with
//! a CSS selector. It handles:
//! - Building an HTTP client with a descriptive user agent
//! - Per-request timeouts (reported as `NotReachable`)
//! - Mapping HTTP status codes onto fetch failures

use crate::config::FetcherConfig;
use crate::fetcher::extract::{extract_display_name, parse_selector};
use crate::fetcher::{FetchFailure, Fetcher};
use crate::record::{Identifier, Record};
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::Selector;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `Name/Version (+ContactURL)`.
///
/// # Example
///
/// ```no_run
/// use ledger_crawl::config::FetcherConfig;
/// use ledger_crawl::fetcher::build_http_client;
///
/// let config = FetcherConfig {
///     crawler_name: "ledger-crawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     ..FetcherConfig::default()
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher that downloads a page and reads its display name from the HTML
pub struct HttpFetcher {
    client: Client,
    selector: Selector,
    settle_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Client built and selector parsed
    /// * `Err(CrawlError)` - The selector is invalid or the client could not be built
    pub fn new(config: &FetcherConfig) -> Result<Self, CrawlError> {
        let selector = parse_selector(&config.title_selector)?;
        let client = build_http_client(config)?;

        Ok(Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            ..Self::with_client(client, selector)
        })
    }

    /// Creates a fetcher around an existing client, with no settle delay
    pub(crate) fn with_client(client: Client, selector: Selector) -> Self {
        Self {
            client,
            selector,
            settle_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: &Identifier) -> Result<Record, FetchFailure> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let response = self
            .client
            .get(id.as_str())
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchFailure::ContentNotFound(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(FetchFailure::NotReachable(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(classify_request_error)?;

        let display_name = extract_display_name(&body, &self.selector).ok_or_else(|| {
            FetchFailure::ContentNotFound("display name element missing or empty".to_string())
        })?;

        Ok(Record::new(id.clone(), display_name, body))
    }
}

/// Normalises a reqwest error into a fetch failure
fn classify_request_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::NotReachable("request timeout".to_string())
    } else if e.is_connect() {
        FetchFailure::NotReachable(format!("connection failed: {}", e))
    } else if e.is_builder() {
        FetchFailure::NotReachable(format!("invalid request: {}", e))
    } else {
        FetchFailure::NotReachable(e.to_string())
    }
}
