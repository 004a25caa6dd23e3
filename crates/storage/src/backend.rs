//! Persistence backends.
//!
//! A backend is the durable write-through target for collection stores:
//! every mutation appends synchronously before it is applied in memory,
//! and `load` rebuilds state at startup. Two implementations:
//!
//! - [`FileBackend`]: one append-only log file per collection
//! - [`MemoryBackend`]: no disk I/O, for tests and ephemeral stores
//!
//! Collection names reach the backend already validated by the engine
//! (non-empty, no path separators).

use crate::codec::LogEntry;
use crate::log::{self, log_path, CollectionLog, LOG_EXTENSION};
use crate::mode::DurabilityMode;
use dashmap::DashMap;
use dynamickv_core::{Error, Record, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Durable storage for collection logs.
///
/// Implementations must be `Send + Sync`: appends for different
/// collections (and different ids within one collection) arrive
/// concurrently, serialized only per collection at the file boundary.
pub trait PersistenceBackend: Send + Sync {
    /// Names of the collections this backend has data for.
    fn collections(&self) -> Result<Vec<String>>;

    /// Replay one collection's entries, oldest first.
    ///
    /// A collection with no backing data yields an empty sequence, not an
    /// error.
    fn load(&self, collection: &str) -> Result<Vec<LogEntry>>;

    /// Durably append one entry; the mutation is committed when this
    /// returns.
    fn append(&self, collection: &str, entry: &LogEntry) -> Result<()>;

    /// Replace a collection's backing data with the given live records.
    fn compact(&self, collection: &str, records: &[Record]) -> Result<()>;
}

/// File-backed persistence: `<data_dir>/<collection>.log` per collection.
pub struct FileBackend {
    dir: PathBuf,
    mode: DurabilityMode,
    logs: DashMap<String, Mutex<CollectionLog>>,
}

impl FileBackend {
    /// Create a backend rooted at `dir`.
    ///
    /// The directory is created lazily on first append, so opening a
    /// store read-only against a missing directory works.
    pub fn new(dir: impl Into<PathBuf>, mode: DurabilityMode) -> Self {
        FileBackend {
            dir: dir.into(),
            mode,
            logs: DashMap::new(),
        }
    }

    /// Data directory this backend writes under
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_log(&self, collection: &str) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        if self.logs.contains_key(collection) {
            return Ok(());
        }
        match self.logs.entry(collection.to_string()) {
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(vacant) => {
                let log = CollectionLog::open(&self.dir, collection, self.mode)?;
                vacant.insert(Mutex::new(log));
                Ok(())
            }
        }
    }
}

impl PersistenceBackend for FileBackend {
    fn collections(&self) -> Result<Vec<String>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::storage(format!(
                    "scan data dir '{}': {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| {
                Error::storage(format!("scan data dir '{}': {}", self.dir.display(), e))
            })?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, collection: &str) -> Result<Vec<LogEntry>> {
        log::replay(&log_path(&self.dir, collection))
    }

    fn append(&self, collection: &str, entry: &LogEntry) -> Result<()> {
        self.ensure_log(collection)?;
        // Entries are never removed from the map, so the handle is present
        // from here on; compaction only swaps the value in place.
        match self.logs.get(collection) {
            Some(cell) => cell.lock().append(entry),
            None => Err(Error::storage(format!(
                "log handle for '{}' disappeared",
                collection
            ))),
        }
    }

    fn compact(&self, collection: &str, records: &[Record]) -> Result<()> {
        let entries: Vec<LogEntry> = records.iter().cloned().map(LogEntry::Put).collect();
        match self.logs.get(collection) {
            // Hold the append lock across the rewrite so no entry lands
            // between the rename and the handle swap.
            Some(cell) => {
                let mut guard = cell.lock();
                log::rewrite(&self.dir, collection, &entries)?;
                *guard = CollectionLog::open(&self.dir, collection, self.mode)?;
                Ok(())
            }
            None => log::rewrite(&self.dir, collection, &entries),
        }
    }
}

/// In-memory persistence for tests and ephemeral stores.
///
/// Keeps the full entry sequence per collection so replay behaves exactly
/// like the file backend, including dead entries until compaction.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<LogEntry>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceBackend for MemoryBackend {
    fn collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn load(&self, collection: &str) -> Result<Vec<LogEntry>> {
        Ok(self
            .entries
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn append(&self, collection: &str, entry: &LogEntry) -> Result<()> {
        self.entries
            .lock()
            .entry(collection.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn compact(&self, collection: &str, records: &[Record]) -> Result<()> {
        let entries = records.iter().cloned().map(LogEntry::Put).collect();
        self.entries
            .lock()
            .insert(collection.to_string(), entries);
        Ok(())
    }
}
