//! Success ledger: the durable record of completed identifiers
//!
//! The ledger pairs an in-memory membership set with an append-only log file.
//! Appends write and sync the log before the set is updated, and both happen
//! under one lock, so the log may lag the set only while an append is in
//! flight and never claims an identifier whose record was not persisted.
//!
//! Log format: one identifier per line, UTF-8, `\n` terminated. Ordering and
//! duplicates carry no meaning; duplicates collapse on load.

use crate::record::Identifier;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Identifier cannot be stored in the ledger: {0:?}")]
    InvalidIdentifier(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Appended after a torn final line; the NUL keeps a truncated identifier
/// (which may be a prefix of a real one) from ever loading as an entry
const TORN_LINE_SEAL: &[u8] = b"\0\n";

/// Outcome of reading a ledger log
#[derive(Debug, Default)]
pub struct LoadedLedger {
    /// Well-formed unique identifiers
    pub entries: HashSet<Identifier>,

    /// Number of lines skipped as malformed or torn
    pub skipped_lines: usize,

    /// True when the log's last line has no terminating newline
    pub torn_tail: bool,
}

/// State guarded by the ledger lock
struct LedgerInner {
    completed: HashSet<Identifier>,
    log: File,
}

/// Durable, crash-consistent record of completed identifiers
pub struct SuccessLedger {
    path: PathBuf,
    inner: Mutex<LedgerInner>,
}

impl SuccessLedger {
    /// Opens the ledger at `path`, loading prior runs and preparing to append
    ///
    /// A missing log is created empty. A torn final line left by a crash is
    /// skipped, then sealed with a NUL terminator so that it stays malformed
    /// on every later load and the next entry starts on a fresh line.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let loaded = Self::load(path)?;

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LedgerError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if loaded.torn_tail {
            log.write_all(TORN_LINE_SEAL)
                .and_then(|_| log.sync_data())
                .map_err(|source| LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        if loaded.skipped_lines > 0 {
            tracing::warn!(
                "Ledger {}: skipped {} malformed line(s)",
                path.display(),
                loaded.skipped_lines
            );
        }
        tracing::info!(
            "Ledger {} loaded with {} completed identifier(s)",
            path.display(),
            loaded.entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(LedgerInner {
                completed: loaded.entries,
                log,
            }),
        })
    }

    /// Reads the ledger log into a membership set
    ///
    /// A missing file is an empty ledger. Lines that are not UTF-8, are blank,
    /// or contain control characters are skipped, as is a final line with no
    /// terminating newline (an append interrupted by a crash).
    pub fn load(path: &Path) -> LedgerResult<LoadedLedger> {
        let mut bytes = Vec::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_end(&mut bytes)
                    .map_err(|source| LedgerError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedLedger::default());
            }
            Err(source) => {
                return Err(LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        Ok(parse_log(&bytes))
    }

    /// Returns true if `id` has already been completed
    pub fn contains(&self, id: &Identifier) -> bool {
        self.lock().completed.contains(id)
    }

    /// Durably records `id` as completed
    ///
    /// The log write is flushed and synced before the in-memory set changes.
    /// On error the set is left untouched, so the identifier will be retried
    /// by a later run.
    pub fn append(&self, id: &Identifier) -> LedgerResult<()> {
        if id.as_str().trim().is_empty() || id.as_str().chars().any(char::is_control) {
            return Err(LedgerError::InvalidIdentifier(id.as_str().to_string()));
        }

        let mut inner = self.lock();

        let mut line = Vec::with_capacity(id.as_str().len() + 1);
        line.extend_from_slice(id.as_str().as_bytes());
        line.push(b'\n');

        inner
            .log
            .write_all(&line)
            .and_then(|_| inner.log.flush())
            .and_then(|_| inner.log.sync_data())
            .map_err(|source| LedgerError::Io {
                path: self.path.clone(),
                source,
            })?;

        inner.completed.insert(id.clone());
        Ok(())
    }

    /// Number of distinct completed identifiers
    pub fn len(&self) -> usize {
        self.lock().completed.len()
    }

    /// Returns true if nothing has been completed yet
    pub fn is_empty(&self) -> bool {
        self.lock().completed.is_empty()
    }

    /// Path of the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sorted copy of the completed identifiers
    pub fn snapshot(&self) -> Vec<Identifier> {
        let mut ids: Vec<_> = self.lock().completed.iter().cloned().collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        // The set is only mutated after a successful sync, so it stays valid
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parses raw log bytes, skipping anything that is not a clean entry
fn parse_log(bytes: &[u8]) -> LoadedLedger {
    let mut loaded = LoadedLedger::default();
    if bytes.is_empty() {
        return loaded;
    }

    let mut lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();

    // split() yields an empty slice after a trailing newline; anything else
    // in the final position was never terminated
    if let Some(last) = lines.pop() {
        if !last.is_empty() {
            loaded.torn_tail = true;
            loaded.skipped_lines += 1;
        }
    }

    for raw in lines {
        match parse_entry(raw) {
            Some(id) => {
                loaded.entries.insert(id);
            }
            None => {
                if !raw.iter().all(|b| b.is_ascii_whitespace()) {
                    loaded.skipped_lines += 1;
                }
            }
        }
    }

    loaded
}

fn parse_entry(raw: &[u8]) -> Option<Identifier> {
    let line = std::str::from_utf8(raw).ok()?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.trim().is_empty() || line.chars().any(char::is_control) {
        return None;
    }

    Some(Identifier::new(line))
}
