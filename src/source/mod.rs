//! Input sources for crawl identifiers
//!
//! An input source hands out identifiers one at a time to any number of
//! concurrent workers. Every source keeps its cursor behind a single lock so
//! that "read one line and advance" is one critical section: no two pulls
//! ever observe the same line, and none is dropped.

mod file;
mod memory;

pub use file::FileSource;
pub use memory::MemorySource;

use crate::record::Identifier;

/// Sequential, exactly-once-per-line supplier of identifiers
///
/// Implementations must be safe to call from many workers at once.
/// `None` signals end of input; once returned, every later call must
/// return `None` as well.
pub trait IdentifierSource: Send + Sync {
    /// Returns the next identifier, or `None` once the input is exhausted
    fn next(&self) -> Option<Identifier>;
}

/// Normalises one raw input line into an identifier
///
/// Surrounding whitespace is trimmed and every `"` is removed (input lists
/// exported from spreadsheets quote each cell). Lines that end up empty
/// yield `None`, as do lines with interior control characters: the ledger
/// cannot store those, so such an identifier could never complete.
///
/// # Example
///
/// ```
/// use ledger_crawl::source::parse_line;
///
/// let id = parse_line("  \"https://a.com/1\"\r\n").unwrap();
/// assert_eq!(id.as_str(), "https://a.com/1");
/// assert!(parse_line("   ").is_none());
/// ```
pub fn parse_line(line: &str) -> Option<Identifier> {
    let unquoted: String = line.trim().chars().filter(|c| *c != '"').collect();
    let trimmed = unquoted.trim();

    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().any(char::is_control) {
        tracing::warn!("Skipping input line {:?}: contains control characters", trimmed);
        return None;
    }

    Some(Identifier::new(trimmed))
}
