//! One-text-file-per-record sink

use crate::record::Record;
use crate::sink::{RecordSink, SinkError, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Extension given to every record file
const RECORD_EXTENSION: &str = "txt";

/// Distinguishes temporary files of concurrent writes that share a stem
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError {
    let path = path.to_path_buf();
    move |source| SinkError::Io { path, source }
}

/// Writes each record to `<directory>/<stem>.txt`
///
/// The file holds the identifier, display name and payload separated by
/// newlines. Each record is written to a hidden temporary file, synced, and
/// renamed into place, so a reader never sees a partially written record
/// under its final name.
pub struct FileSink {
    directory: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into `directory`, creating it if needed
    pub fn new(directory: &Path) -> SinkResult<Self> {
        std::fs::create_dir_all(directory).map_err(|source| SinkError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    /// Directory records are written into
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Final path a record would be written to
    pub fn record_path(&self, record: &Record) -> PathBuf {
        self.directory.join(format!(
            "{}.{}",
            record.identifier.output_stem(),
            RECORD_EXTENSION
        ))
    }

    fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }

    /// Syncs the directory entry so the rename itself survives a crash
    #[cfg(unix)]
    fn sync_directory(&self) -> std::io::Result<()> {
        File::open(&self.directory)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> std::io::Result<()> {
        Ok(())
    }
}

impl RecordSink for FileSink {
    fn persist(&self, record: &Record) -> SinkResult<PathBuf> {
        if record.identifier.as_str().contains('\n') || record.display_name.contains('\n') {
            return Err(SinkError::InvalidRecord(format!(
                "identifier and display name must be single-line: {}",
                record.identifier
            )));
        }

        let final_path = self.record_path(record);
        let temp_path = self.directory.join(format!(
            ".{}.{}.{}.tmp",
            record.identifier.output_stem(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = Self::write_synced(&temp_path, record.to_text().as_bytes())
            .and_then(|_| std::fs::rename(&temp_path, &final_path));
        if let Err(source) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(SinkError::Io {
                path: final_path,
                source,
            });
        }
        self.sync_directory().map_err(io_error(&self.directory))?;

        tracing::debug!("Saved {} to {}", record.identifier, final_path.display());

        Ok(final_path)
    }
}
