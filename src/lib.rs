//! DynamicKV - schemaless key-value document store with an HTTP interface
//!
//! DynamicKV stores JSON-compatible records in named, independently-lived
//! collections. Records get store-assigned ids and timestamps; queries are
//! brute-force scans (id lookup, inclusive numeric range, case-insensitive
//! substring); every mutation is persisted write-ahead to one append-only
//! log file per collection.
//!
//! # Quick Start
//!
//! ```ignore
//! use dynamickv::{FileBackend, DurabilityMode, Store, TimeRandomIds, Value};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(FileBackend::new("./data", DurabilityMode::Always));
//! let store = Arc::new(Store::open(backend, Arc::new(TimeRandomIds))?);
//!
//! let products = store.collection("products")?;
//! let record = products.create(
//!     [("name".to_string(), Value::from("Widget"))].into_iter().collect(),
//! )?;
//! let found = products.get(&record.id);
//! ```
//!
//! # Architecture
//!
//! - `dynamickv-core` - value/record model, ids, errors
//! - `dynamickv-storage` - record codec and append-only persistence
//! - `dynamickv-engine` - collection stores and the query layer
//! - `dynamickv-server` - the HTTP gateway and the `dynamickv` binary

pub use dynamickv_core::{
    current_timestamp, Error, Fields, IdGenerator, Record, Result, SequentialIds, TimeRandomIds,
    Value,
};
pub use dynamickv_engine::{query, Collection, Store};
pub use dynamickv_server::{Gateway, Method, Request, Response, Server, ServerConfig};
pub use dynamickv_storage::{
    DurabilityMode, FileBackend, LogEntry, MemoryBackend, PersistenceBackend,
};
