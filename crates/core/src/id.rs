//! Id generation
//!
//! Ids are store-assigned, never client-supplied. The strategy is
//! injectable so tests can run with deterministic ids while production uses
//! timestamp + random suffixes.
//!
//! The default generator never recycles ids: a deleted record's id stays
//! retired, so references a caller cached before the delete can never
//! silently point at an unrelated newer record.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Id generation strategy for one store
///
/// Implementations must be `Send + Sync`; a single generator is shared by
/// every collection in a store and may be called concurrently.
pub trait IdGenerator: Send + Sync {
    /// Produce the next id for `collection`.
    ///
    /// Ids must be unique within a collection for the lifetime of its data,
    /// including across restarts.
    fn next(&self, collection: &str) -> String;
}

/// Default generator: collection prefix + millisecond timestamp + random
/// suffix, e.g. `products_1722850000000_3fa9c1d2`.
///
/// The timestamp keeps ids roughly sortable by creation time; the random
/// suffix makes same-millisecond collisions vanishingly unlikely. The
/// collection store still re-draws on the (theoretical) collision.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeRandomIds;

impl IdGenerator for TimeRandomIds {
    fn next(&self, collection: &str) -> String {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}", collection, millis, &suffix[..8])
    }
}

/// Deterministic generator for tests: `collection_1`, `collection_2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    /// Create a generator starting at 1
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next(&self, collection: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{}", collection, n)
    }
}
