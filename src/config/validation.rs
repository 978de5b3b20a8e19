use crate::config::types::{Config, CrawlerConfig, FetcherConfig, InputConfig, OutputConfig};
use crate::fetcher::parse_selector;
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
pub const MAX_WORKERS: u32 = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_input_config(&config.input)?;
    validate_output_config(&config.output)?;
    validate_fetcher_config(&config.fetcher)?;
    Ok(())
}

/// Validates worker pool configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    Ok(())
}

/// Validates input configuration
fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "input path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    // The ledger lives next to the records, so it must not look like one
    let ledger = &config.ledger_file;
    if !ledger.starts_with('.') || ledger.len() < 2 || ledger == ".." {
        return Err(ConfigError::Validation(format!(
            "ledger-file must be a hidden file name starting with '.', got '{}'",
            ledger
        )));
    }

    if ledger.contains('/') || ledger.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "ledger-file must be a plain file name, got '{}'",
            ledger
        )));
    }

    if ledger.ends_with(".txt") || ledger.ends_with(".tmp") {
        return Err(ConfigError::Validation(format!(
            "ledger-file must not use a record or temp extension, got '{}'",
            ledger
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    parse_selector(&config.title_selector)?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}
