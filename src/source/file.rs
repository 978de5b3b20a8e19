//! File-backed identifier source
//!
//! Streams the input list line by line instead of loading it into memory.

use crate::record::Identifier;
use crate::source::{parse_line, IdentifierSource};
use crate::CrawlError;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Read position over a line-oriented reader
///
/// Lines end at `\n`, `\r\n` or a bare `\r`, so lists saved with old Mac
/// line endings still yield one identifier per line.
struct LineCursor<R> {
    reader: R,
    pending: VecDeque<Vec<u8>>,
    exhausted: bool,
    line_number: u64,
}

impl<R: BufRead> LineCursor<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            exhausted: false,
            line_number: 0,
        }
    }

    /// Advances past blank and undecodable lines to the next identifier
    fn advance(&mut self) -> Option<Identifier> {
        loop {
            let raw = match self.pending.pop_front() {
                Some(raw) => raw,
                None => {
                    if self.fill() {
                        continue;
                    }
                    return None;
                }
            };

            self.line_number += 1;
            match std::str::from_utf8(&raw) {
                Ok(line) => {
                    if let Some(id) = parse_line(line) {
                        return Some(id);
                    }
                }
                Err(_) => {
                    tracing::warn!("Skipping input line {}: not valid UTF-8", self.line_number);
                }
            }
        }
    }

    /// Reads the next `\n`-terminated chunk into `pending`
    ///
    /// Returns false once the reader is exhausted or has failed.
    fn fill(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.exhausted = true;
                false
            }
            Ok(_) => {
                let body = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                let body = body.strip_suffix(b"\r").unwrap_or(body);
                self.pending
                    .extend(body.split(|b| *b == b'\r').map(<[u8]>::to_vec));
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Input read failed after line {}, treating as end of input: {}",
                    self.line_number,
                    e
                );
                self.exhausted = true;
                false
            }
        }
    }
}

/// Identifier source backed by a text file, one identifier per line
pub struct FileSource {
    cursor: Mutex<LineCursor<BufReader<File>>>,
}

impl FileSource {
    /// Opens the input list at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(FileSource)` - The file was opened and is ready to stream
    /// * `Err(CrawlError::SourceNotFound)` - The file is missing or unreadable
    pub fn open(path: &Path) -> Result<Self, CrawlError> {
        let file = File::open(path).map_err(|source| CrawlError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        // A directory opens fine on some platforms but fails on first read
        let metadata = file.metadata().map_err(|source| CrawlError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(CrawlError::SourceNotFound {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "input path is a directory",
                ),
            });
        }

        tracing::debug!("Opened input list {}", path.display());

        Ok(Self {
            cursor: Mutex::new(LineCursor::new(BufReader::new(file))),
        })
    }
}

impl IdentifierSource for FileSource {
    fn next(&self) -> Option<Identifier> {
        // A poisoned cursor is still positioned on a line boundary
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.advance()
    }
}
