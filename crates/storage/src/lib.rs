//! Persistence layer for DynamicKV: the record codec and the durable
//! backends.
//!
//! The storage layer never assigns ids or timestamps - records arrive fully
//! formed from the collection store and are persisted byte-exact. One
//! durable unit (an append-only log file) per collection.

pub mod backend;
pub mod codec;
pub mod log;
pub mod mode;

pub use backend::{FileBackend, MemoryBackend, PersistenceBackend};
pub use codec::{decode_entry, decode_record, encode_entry, encode_record, FrameError, LogEntry};
pub use log::CollectionLog;
pub use mode::DurabilityMode;
