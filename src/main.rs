//! Ledger-Crawl main entry point
//!
//! This is the command-line interface for the Ledger-Crawl crawl coordinator.

use anyhow::Context;
use clap::Parser;
use ledger_crawl::config::{load_config_with_hash, validate, Config};
use ledger_crawl::crawler::crawl;
use ledger_crawl::report::{print_report, write_failure_list};
use ledger_crawl::{FileSource, IdentifierSource, SuccessLedger};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Ledger-Crawl: a resumable, concurrent crawl coordinator
///
/// Ledger-Crawl fetches every identifier in an input list with a pool of
/// workers, writes one record file per success, and keeps a ledger so that
/// re-running after a crash or partial failure only fetches what is left.
#[derive(Parser, Debug)]
#[command(name = "ledger-crawl")]
#[command(version)]
#[command(about = "A resumable, concurrent crawl coordinator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the number of workers from the config file
    #[arg(short, long, value_name = "N")]
    workers: Option<u32>,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,

    /// Write identifiers that failed to this file, one per line
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    failures_out: Option<PathBuf>,
}

/// Exit code when the run finished but some identifiers failed
const EXIT_PARTIAL: u8 = 1;

/// Exit code for startup, configuration, and ledger errors
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
        validate(&config).context("invalid --workers override")?;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(&config, cli.failures_out.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ledger_crawl=info,warn"),
            1 => EnvFilter::new("ledger_crawl=debug,info"),
            2 => EnvFilter::new("ledger_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows how much work a run would do
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Ledger-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Input: {}", config.input.path);
    println!("  Output directory: {}", config.output.directory);
    println!("  Ledger: {}", config.ledger_path().display());

    println!("\nFetcher:");
    println!(
        "  User agent: {}/{} (+{})",
        config.fetcher.crawler_name, config.fetcher.crawler_version, config.fetcher.contact_url
    );
    println!("  Title selector: {}", config.fetcher.title_selector);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);

    // Read-only view of the ledger: a dry run must not create files
    let completed = SuccessLedger::load(&config.ledger_path())
        .context("failed to read ledger")?
        .entries;

    let source = FileSource::open(Path::new(&config.input.path))?;
    let mut total = 0usize;
    let mut already_done = 0usize;
    while let Some(id) = source.next() {
        total += 1;
        if completed.contains(&id) {
            already_done += 1;
        }
    }

    println!("\nInput:");
    println!("  Identifiers: {}", total);
    println!("  Already completed: {}", already_done);
    println!("  Would fetch: {}", total - already_done);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, failures_out: Option<&Path>) -> anyhow::Result<ExitCode> {
    tracing::info!(
        "Crawling {} into {} with {} worker(s)",
        config.input.path,
        config.output.directory,
        config.crawler.workers
    );

    let report = crawl(config).await.context("crawl failed")?;

    print_report(&report);

    if let Some(path) = failures_out {
        let written = write_failure_list(&report, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Wrote {} failed identifier(s) to {}", written, path.display());
    }

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}
