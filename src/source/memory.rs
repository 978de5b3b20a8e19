//! In-memory identifier source

use crate::record::Identifier;
use crate::source::{parse_line, IdentifierSource};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Identifier source over an in-memory list of lines
///
/// Lines go through the same normalisation as a file source, so blank and
/// quoted entries behave identically.
pub struct MemorySource {
    queue: Mutex<VecDeque<Identifier>>,
}

impl MemorySource {
    /// Creates a source from raw input lines
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let queue = lines
            .into_iter()
            .filter_map(|line| parse_line(line.as_ref()))
            .collect();

        Self {
            queue: Mutex::new(queue),
        }
    }

    /// Returns how many identifiers have not been handed out yet
    #[cfg(test)]
    fn remaining(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl IdentifierSource for MemorySource {
    fn next(&self) -> Option<Identifier> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}
