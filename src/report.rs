//! Human-readable crawl reports
//!
//! This module formats a [`CrawlReport`] for the terminal and exports the
//! failed identifiers in the input-list format, so it can be fed straight
//! back into a retry run.

use crate::crawler::CrawlReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Formats a crawl report as plain text
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    let (unreachable, missing) = report.failure_breakdown();

    out.push_str("=== Crawl Report ===\n\n");

    // Run metadata
    out.push_str("Run:\n");
    out.push_str(&format!("  Started: {}\n", report.started_at.to_rfc3339()));
    out.push_str(&format!("  Finished: {}\n", report.finished_at.to_rfc3339()));
    out.push_str(&format!(
        "  Duration: {:.1}s\n",
        report.duration().num_milliseconds() as f64 / 1000.0
    ));
    out.push_str(&format!("  Workers: {}\n\n", report.workers));

    // Counts
    out.push_str("Identifiers:\n");
    out.push_str(&format!("  Pulled: {}\n", report.pulled));
    out.push_str(&format!("  Completed this run: {}\n", report.completed));
    out.push_str(&format!(
        "  Skipped (already completed): {}\n",
        report.skipped
    ));
    out.push_str(&format!(
        "  Fetch failures: {} ({} not reachable, {} content not found)\n",
        report.fetch_failures.len(),
        unreachable,
        missing
    ));
    out.push_str(&format!(
        "  Persist failures: {}\n",
        report.persist_failures.len()
    ));

    if !report.fetch_failures.is_empty() {
        out.push_str(&format!(
            "\nFailed to fetch ({}):\n",
            report.fetch_failures.len()
        ));
        for failure in &report.fetch_failures {
            out.push_str(&format!("  - {} ({})\n", failure.identifier, failure.reason));
        }
    }

    if !report.persist_failures.is_empty() {
        out.push_str(&format!(
            "\nFailed to persist ({}):\n",
            report.persist_failures.len()
        ));
        for failure in &report.persist_failures {
            out.push_str(&format!("  - {} ({})\n", failure.identifier, failure.message));
        }
    }

    out
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Writes every failed identifier (fetch and persist) one per line
///
/// The file is a valid input list: running the crawler over it retries
/// exactly the identifiers that did not complete.
pub fn write_failure_list(report: &CrawlReport, path: &Path) -> std::io::Result<usize> {
    let mut file = File::create(path)?;
    let mut count = 0;

    let identifiers = report
        .fetch_failures
        .iter()
        .map(|f| &f.identifier)
        .chain(report.persist_failures.iter().map(|f| &f.identifier));

    for id in identifiers {
        writeln!(file, "{}", id)?;
        count += 1;
    }

    file.sync_all()?;
    Ok(count)
}
