//! Collection store: one collection's records and their mutation path.
//!
//! ## Design
//!
//! A `Collection` owns the in-memory map for one named collection and is
//! the only component that appends to that collection's log. All state
//! behind one `RwLock`; reads take the lock only long enough to clone a
//! consistent snapshot.
//!
//! ## Write Path
//!
//! Mutations are write-ahead: the log append must succeed before the
//! in-memory map changes. A failed append therefore aborts cleanly with
//! memory untouched; a crash between append and apply resolves to
//! "committed" at the next replay.
//!
//! ## Per-Id Serialization
//!
//! `update` and `delete` targeting the same id are serialized through a
//! per-id lock map. Different ids never share a lock, so writers to
//! unrelated records proceed independently; readers never take an id lock
//! at all.

use dashmap::DashMap;
use dynamickv_core::{Error, Fields, IdGenerator, Record, Result};
use dynamickv_storage::{LogEntry, PersistenceBackend};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// In-memory state of one collection.
///
/// `order` holds ids in insertion order - the canonical iteration order
/// for listing and queries. Updates replace the map entry in place and
/// never move a record's position.
#[derive(Default)]
struct CollectionState {
    records: FxHashMap<String, Record>,
    order: Vec<String>,
}

impl CollectionState {
    fn insert(&mut self, record: Record) {
        if !self.records.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }
        self.records.insert(record.id.clone(), record);
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.records.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        true
    }
}

/// Counters from replaying a collection's log at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Total entries replayed
    pub entries: usize,
    /// Live records after replay
    pub live: usize,
}

impl ReplayStats {
    /// Entries that no longer contribute to live state (overwritten puts,
    /// tombstones and the puts they killed).
    pub fn dead(&self) -> usize {
        self.entries - self.live
    }
}

/// One named collection of records
pub struct Collection {
    name: String,
    state: RwLock<CollectionState>,
    write_locks: DashMap<String, Arc<Mutex<()>>>,
    backend: Arc<dyn PersistenceBackend>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Create an empty collection
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn PersistenceBackend>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Collection {
            name: name.into(),
            state: RwLock::new(CollectionState::default()),
            write_locks: DashMap::new(),
            backend,
            ids,
        }
    }

    /// Rebuild a collection from its replayed log entries.
    pub fn from_entries(
        name: impl Into<String>,
        entries: Vec<LogEntry>,
        backend: Arc<dyn PersistenceBackend>,
        ids: Arc<dyn IdGenerator>,
    ) -> (Self, ReplayStats) {
        let collection = Collection::new(name, backend, ids);
        let total = entries.len();
        {
            let mut state = collection.state.write();
            for entry in entries {
                match entry {
                    LogEntry::Put(record) => state.insert(record),
                    LogEntry::Delete { id } => {
                        state.remove(&id);
                    }
                }
            }
        }
        let live = collection.state.read().records.len();
        (
            collection,
            ReplayStats {
                entries: total,
                live,
            },
        )
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// True if the collection holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a record from a field map.
    ///
    /// The store assigns the id and both timestamps; reserved field names
    /// in `value` are dropped. The record is durable before it is visible.
    pub fn create(&self, value: Fields) -> Result<Record> {
        let id = self.next_free_id();
        let record = Record::new(id, value);

        self.backend
            .append(&self.name, &LogEntry::Put(record.clone()))?;
        self.state.write().insert(record.clone());

        debug!(collection = %self.name, id = %record.id, "created record");
        Ok(record)
    }

    /// Fetch one record by id
    pub fn get(&self, id: &str) -> Option<Record> {
        self.state.read().records.get(id).cloned()
    }

    /// Shallow-merge `partial` into the record with this id.
    ///
    /// Provided top-level fields replace; omitted fields are preserved;
    /// `updated_at` strictly advances. Serialized against other writers of
    /// the same id; writers of other ids are unaffected.
    pub fn update(&self, id: &str, partial: Fields) -> Result<Record> {
        let id_lock = self.id_lock(id);
        let _guard = id_lock.lock();

        let Some(mut record) = self.get(id) else {
            return Err(Error::not_found(&self.name, id));
        };
        record.merge(partial);

        self.backend
            .append(&self.name, &LogEntry::Put(record.clone()))?;
        self.state.write().insert(record.clone());

        debug!(collection = %self.name, id = %id, "updated record");
        Ok(record)
    }

    /// Remove a record permanently.
    ///
    /// Returns `false` (not an error) if the id is absent. The id is never
    /// handed out again by the default generator.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let id_lock = self.id_lock(id);
        let _guard = id_lock.lock();

        if self.get(id).is_none() {
            return Ok(false);
        }

        self.backend.append(
            &self.name,
            &LogEntry::Delete { id: id.to_string() },
        )?;
        self.state.write().remove(id);
        drop(_guard);
        self.write_locks.remove(id);

        debug!(collection = %self.name, id = %id, "deleted record");
        Ok(true)
    }

    /// List records in insertion order.
    ///
    /// Each call reads a fresh consistent snapshot, so iteration is
    /// restartable and pagination with `limit`/`offset` is deterministic.
    pub fn list(&self, limit: Option<usize>, offset: Option<usize>) -> Vec<Record> {
        let state = self.state.read();
        state
            .order
            .iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .filter_map(|id| state.records.get(id).cloned())
            .collect()
    }

    /// Snapshot of every record in insertion order
    pub fn snapshot(&self) -> Vec<Record> {
        self.list(None, None)
    }

    /// Draw ids until one is unused.
    ///
    /// The default generator makes collisions vanishingly unlikely; the
    /// loop is the correctness backstop for injected generators.
    fn next_free_id(&self) -> String {
        loop {
            let id = self.ids.next(&self.name);
            if !self.state.read().records.contains_key(&id) {
                return id;
            }
        }
    }

    fn id_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(id.to_string())
            .or_default()
            .value()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamickv_core::{SequentialIds, Value};
    use dynamickv_storage::MemoryBackend;
    use std::collections::HashSet;

    fn collection() -> Collection {
        Collection::new(
            "products",
            Arc::new(MemoryBackend::new()),
            Arc::new(SequentialIds::new()),
        )
    }

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_create_assigns_id_and_timestamps() {
        let c = collection();
        let record = c
            .create(fields(&[("name", Value::from("Widget"))]))
            .unwrap();
        assert_eq!(record.id, "products_1");
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(c.get("products_1").unwrap(), record);
    }

    #[test]
    fn test_create_ids_are_unique() {
        let c = collection();
        let ids: HashSet<String> = (0..100)
            .map(|_| c.create(Fields::new()).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_get_absent_is_none() {
        assert!(collection().get("missing").is_none());
    }

    #[test]
    fn test_update_merges_and_advances_updated_at() {
        let c = collection();
        let created = c
            .create(fields(&[("a", Value::Int(1)), ("b", Value::Int(2))]))
            .unwrap();

        let updated = c
            .update(&created.id, fields(&[("b", Value::Int(3))]))
            .unwrap();
        assert_eq!(updated.field("a"), Some(&Value::Int(1)));
        assert_eq!(updated.field("b"), Some(&Value::Int(3)));
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_update_absent_is_not_found() {
        let err = collection().update("missing", Fields::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_twice_returns_true_then_false() {
        let c = collection();
        let record = c.create(Fields::new()).unwrap();
        assert!(c.delete(&record.id).unwrap());
        assert!(!c.delete(&record.id).unwrap());
        assert!(c.get(&record.id).is_none());
    }

    #[test]
    fn test_list_is_insertion_ordered() {
        let c = collection();
        let ids: Vec<String> = (0..5)
            .map(|_| c.create(Fields::new()).unwrap().id)
            .collect();
        let listed: Vec<String> = c.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_update_does_not_move_record() {
        let c = collection();
        let first = c.create(Fields::new()).unwrap();
        let _second = c.create(Fields::new()).unwrap();
        c.update(&first.id, fields(&[("x", Value::Int(1))])).unwrap();
        let listed: Vec<String> = c.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(listed[0], first.id);
    }

    #[test]
    fn test_list_pagination() {
        let c = collection();
        let ids: Vec<String> = (0..10)
            .map(|_| c.create(Fields::new()).unwrap().id)
            .collect();
        let page: Vec<String> = c
            .list(Some(3), Some(4))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(page, ids[4..7].to_vec());
        assert!(c.list(Some(5), Some(20)).is_empty());
    }

    #[test]
    fn test_replay_rebuilds_state() {
        let backend: Arc<dyn PersistenceBackend> = Arc::new(MemoryBackend::new());
        let ids = Arc::new(SequentialIds::new());
        let c = Collection::new("products", backend.clone(), ids.clone());
        let keep = c.create(fields(&[("name", Value::from("Widget"))])).unwrap();
        let kill = c.create(Fields::new()).unwrap();
        c.update(&keep.id, fields(&[("price", Value::Float(9.99))]))
            .unwrap();
        c.delete(&kill.id).unwrap();

        let entries = backend.load("products").unwrap();
        let (rebuilt, stats) =
            Collection::from_entries("products", entries, backend, ids);
        assert_eq!(stats.entries, 4);
        assert_eq!(stats.live, 1);
        assert_eq!(stats.dead(), 3);
        let record = rebuilt.get(&keep.id).unwrap();
        assert_eq!(record.field("price"), Some(&Value::Float(9.99)));
        assert_eq!(record.field("name"), Some(&Value::from("Widget")));
    }

    #[test]
    fn test_create_strips_reserved_fields() {
        let c = collection();
        let record = c
            .create(fields(&[
                ("id", Value::from("spoofed")),
                ("name", Value::from("Widget")),
            ]))
            .unwrap();
        assert_eq!(record.id, "products_1");
        assert!(record.field("id").is_none());
    }

    #[test]
    fn test_id_collision_redraws() {
        // A generator that repeats itself: the store must skip taken ids
        struct Cycling(std::sync::atomic::AtomicU64);
        impl IdGenerator for Cycling {
            fn next(&self, _collection: &str) -> String {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                format!("id_{}", n / 2) // every id drawn twice
            }
        }

        let c = Collection::new(
            "products",
            Arc::new(MemoryBackend::new()),
            Arc::new(Cycling(std::sync::atomic::AtomicU64::new(0))),
        );
        let a = c.create(Fields::new()).unwrap();
        let b = c.create(Fields::new()).unwrap();
        assert_ne!(a.id, b.id);
    }

    // Two concurrent writers to the same id must serialize: the final
    // state reflects one full update, never a partial interleaving.
    #[test]
    fn test_concurrent_same_id_updates_serialize() {
        let c = Arc::new(collection());
        let record = c
            .create(fields(&[("a", Value::Int(0)), ("b", Value::Int(0))]))
            .unwrap();

        let mut handles = Vec::new();
        for n in 1..=8i64 {
            let c = c.clone();
            let id = record.id.clone();
            handles.push(std::thread::spawn(move || {
                c.update(&id, fields(&[("a", Value::Int(n)), ("b", Value::Int(n))]))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let final_record = c.get(&record.id).unwrap();
        // Last committed update wins as a unit
        assert_eq!(final_record.field("a"), final_record.field("b"));
    }

    #[test]
    fn test_concurrent_different_ids_all_land() {
        let c = Arc::new(collection());
        let ids: Vec<String> = (0..8)
            .map(|_| c.create(Fields::new()).unwrap().id)
            .collect();

        let mut handles = Vec::new();
        for id in &ids {
            let c = c.clone();
            let id = id.clone();
            handles.push(std::thread::spawn(move || {
                c.update(&id, fields(&[("touched", Value::Bool(true))]))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for id in &ids {
            assert_eq!(
                c.get(id).unwrap().field("touched"),
                Some(&Value::Bool(true))
            );
        }
    }

    // Write-ahead: a failing backend must leave memory untouched
    #[test]
    fn test_failed_append_aborts_mutation() {
        struct FailingBackend;
        impl PersistenceBackend for FailingBackend {
            fn collections(&self) -> Result<Vec<String>> {
                Ok(Vec::new())
            }
            fn load(&self, _collection: &str) -> Result<Vec<LogEntry>> {
                Ok(Vec::new())
            }
            fn append(&self, _collection: &str, _entry: &LogEntry) -> Result<()> {
                Err(Error::storage("disk on fire"))
            }
            fn compact(&self, _collection: &str, _records: &[Record]) -> Result<()> {
                Err(Error::storage("disk on fire"))
            }
        }

        let c = Collection::new(
            "products",
            Arc::new(FailingBackend),
            Arc::new(SequentialIds::new()),
        );
        let err = c.create(Fields::new()).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(c.is_empty());
    }
}
