//! Store: the registry of collections behind one backend.
//!
//! Constructed once at process start with an injected backend and id
//! strategy, then passed by handle to the gateway. Collections come into
//! existence implicitly on first use; names are case-sensitive.

use crate::collection::Collection;
use dashmap::DashMap;
use dynamickv_core::{Error, IdGenerator, Result};
use dynamickv_storage::PersistenceBackend;
use std::sync::Arc;
use tracing::info;

/// Replayed logs whose dead-entry share exceeds this ratio are rewritten
/// at startup.
const COMPACT_DEAD_RATIO: f64 = 0.5;
/// Logs smaller than this many entries are never worth compacting.
const COMPACT_MIN_ENTRIES: usize = 64;

/// A handle to every collection behind one persistence backend
pub struct Store {
    collections: DashMap<String, Arc<Collection>>,
    backend: Arc<dyn PersistenceBackend>,
    ids: Arc<dyn IdGenerator>,
}

impl Store {
    /// Open a store: replay every collection the backend knows about.
    ///
    /// Logs carrying mostly dead entries are compacted on the way in.
    /// Fails with `Error::Corruption` if committed data no longer reads
    /// back (see the storage layer's recovery rules).
    pub fn open(
        backend: Arc<dyn PersistenceBackend>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let store = Store {
            collections: DashMap::new(),
            backend: backend.clone(),
            ids,
        };

        for name in backend.collections()? {
            let entries = backend.load(&name)?;
            let (collection, stats) = Collection::from_entries(
                name.clone(),
                entries,
                backend.clone(),
                store.ids.clone(),
            );

            let dead_ratio = if stats.entries == 0 {
                0.0
            } else {
                stats.dead() as f64 / stats.entries as f64
            };
            if stats.entries >= COMPACT_MIN_ENTRIES && dead_ratio > COMPACT_DEAD_RATIO {
                backend.compact(&name, &collection.snapshot())?;
                info!(
                    collection = %name,
                    entries = stats.entries,
                    live = stats.live,
                    "compacted collection log on startup"
                );
            }

            info!(collection = %name, records = stats.live, "loaded collection");
            store.collections.insert(name, Arc::new(collection));
        }

        Ok(store)
    }

    /// Get a collection handle, creating the collection on first use.
    ///
    /// Fails with `Error::Validation` for names the store cannot accept.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        validate_collection_name(name)?;
        if let Some(existing) = self.collections.get(name) {
            return Ok(existing.clone());
        }
        let created = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Collection::new(
                    name,
                    self.backend.clone(),
                    self.ids.clone(),
                ))
            });
        Ok(created.clone())
    }

    /// Names of collections currently known to the store, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Rewrite every collection's log from its live records.
    pub fn compact(&self) -> Result<()> {
        for entry in self.collections.iter() {
            self.backend
                .compact(entry.key(), &entry.value().snapshot())?;
        }
        Ok(())
    }
}

/// A collection name must be usable as a single path segment and a file
/// stem.
fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("collection name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(Error::validation(format!(
            "invalid collection name '{}'",
            name
        )));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control())
    {
        return Err(Error::validation(format!(
            "collection name '{}' contains forbidden characters",
            name
        )));
    }
    Ok(())
}
