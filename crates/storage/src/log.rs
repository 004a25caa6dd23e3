//! Append-only collection log.
//!
//! One log file per collection, `<name>.log`, holding framed entries
//! (see [`crate::codec`]). The log is the durable unit: a mutation is
//! committed once its entry is on disk, and replaying the log from the
//! start reproduces the collection's state.
//!
//! # Crash Recovery
//!
//! Replay stops at the first truncated entry and trims the file back to
//! the last complete one - a torn tail is the expected artifact of an
//! unclean shutdown and never affects entries committed before the crash.
//! A checksum or framing failure on an *interior* entry is different:
//! committed data no longer reads back, so replay refuses the log with a
//! corruption error instead of silently dropping records.

use crate::codec::{decode_entry, encode_entry, FrameError, LogEntry};
use crate::mode::DurabilityMode;
use dynamickv_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of collection log files
pub const LOG_EXTENSION: &str = "log";

/// Writable handle to one collection's log file.
pub struct CollectionLog {
    file: File,
    path: PathBuf,
    mode: DurabilityMode,
}

impl CollectionLog {
    /// Open (creating if absent) the log for `name` under `dir`.
    pub fn open(dir: &Path, name: &str, mode: DurabilityMode) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::storage(format!("create data dir '{}': {}", dir.display(), e)))?;
        let path = log_path(dir, name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::storage(format!("open log '{}': {}", path.display(), e)))?;
        Ok(CollectionLog { file, path, mode })
    }

    /// Append one entry and make it durable per the configured mode.
    ///
    /// The entry is fully framed before any byte reaches the file, so a
    /// failed encode leaves the log untouched.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let bytes = encode_entry(entry)?;
        self.file
            .write_all(&bytes)
            .map_err(|e| Error::storage(format!("append to '{}': {}", self.path.display(), e)))?;
        if self.mode.requires_sync() {
            self.file.sync_data().map_err(|e| {
                Error::storage(format!("fsync '{}': {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Log file path for a collection name
pub fn log_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, LOG_EXTENSION))
}

/// Replay a collection log into its entry sequence.
///
/// A missing file is an empty collection, not an error. A torn trailing
/// entry is truncated away; interior corruption aborts with
/// `Error::Corruption`.
pub fn replay(path: &Path) -> Result<Vec<LogEntry>> {
    let buffer = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Error::storage(format!(
                "read log '{}': {}",
                path.display(),
                e
            )))
        }
    };

    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < buffer.len() {
        match decode_entry(&buffer[offset..]) {
            Ok((entry, consumed)) => {
                entries.push(entry);
                offset += consumed;
            }
            Err(FrameError::InsufficientData) => {
                // Torn tail from an unclean shutdown: trim back to the last
                // complete entry.
                warn!(
                    log = %path.display(),
                    valid_bytes = offset,
                    torn_bytes = buffer.len() - offset,
                    "truncating torn entry at end of collection log"
                );
                truncate_to(path, offset as u64)?;
                break;
            }
            Err(FrameError::ChecksumMismatch { expected, actual }) => {
                return Err(Error::corruption(format!(
                    "log '{}' entry at offset {}: checksum mismatch (stored {:#010x}, computed {:#010x})",
                    path.display(),
                    offset,
                    expected,
                    actual
                )));
            }
            Err(FrameError::Malformed(msg)) => {
                return Err(Error::corruption(format!(
                    "log '{}' entry at offset {}: {}",
                    path.display(),
                    offset,
                    msg
                )));
            }
        }
    }

    debug!(log = %path.display(), entries = entries.len(), "replayed collection log");
    Ok(entries)
}

/// Rewrite a collection log from live records (compaction).
///
/// Writes a sibling temp file, fsyncs it, then atomically renames it over
/// the log so a crash mid-compaction leaves either the old log or the new
/// one - never a mix.
pub fn rewrite(dir: &Path, name: &str, entries: &[LogEntry]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::storage(format!("create data dir '{}': {}", dir.display(), e)))?;
    let path = log_path(dir, name);
    let tmp_path = dir.join(format!("{}.{}.tmp", name, LOG_EXTENSION));

    let mut tmp = File::create(&tmp_path)
        .map_err(|e| Error::storage(format!("create '{}': {}", tmp_path.display(), e)))?;
    for entry in entries {
        let bytes = encode_entry(entry)?;
        tmp.write_all(&bytes)
            .map_err(|e| Error::storage(format!("write '{}': {}", tmp_path.display(), e)))?;
    }
    tmp.sync_data()
        .map_err(|e| Error::storage(format!("fsync '{}': {}", tmp_path.display(), e)))?;
    drop(tmp);

    std::fs::rename(&tmp_path, &path).map_err(|e| {
        Error::storage(format!(
            "rename '{}' over '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ))
    })?;
    Ok(())
}

fn truncate_to(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| Error::storage(format!("open '{}' for truncate: {}", path.display(), e)))?;
    file.set_len(len)
        .map_err(|e| Error::storage(format!("truncate '{}': {}", path.display(), e)))?;
    file.sync_data()
        .map_err(|e| Error::storage(format!("fsync '{}': {}", path.display(), e)))?;
    Ok(())
}
