use serde::Deserialize;
use std::path::PathBuf;

/// Default ledger file name inside the output directory
pub const DEFAULT_LEDGER_FILE: &str = ".crawl-ledger";

/// Default CSS selector for the display name
pub const DEFAULT_TITLE_SELECTOR: &str = "h1.page-title__title";

/// Main configuration structure for Ledger-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

impl Config {
    /// Full path of the success ledger
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.output.directory).join(&self.output.ledger_file)
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: u32,
}

/// Input list configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the input list, one identifier per line
    pub path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one record file per identifier
    pub directory: String,

    /// Ledger file name, relative to the output directory
    #[serde(rename = "ledger-file", default = "default_ledger_file")]
    pub ledger_file: String,
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Name of the crawler, used in the user agent
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler, used in the user agent
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    /// CSS selector whose text becomes the record's display name
    #[serde(rename = "title-selector", default = "default_title_selector")]
    pub title_selector: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Pause before each request (milliseconds)
    #[serde(rename = "settle-delay-ms", default)]
    pub settle_delay_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            title_selector: default_title_selector(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            settle_delay_ms: 0,
        }
    }
}

fn default_ledger_file() -> String {
    DEFAULT_LEDGER_FILE.to_string()
}

fn default_crawler_name() -> String {
    "ledger-crawl".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/".to_string()
}

fn default_title_selector() -> String {
    DEFAULT_TITLE_SELECTOR.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
