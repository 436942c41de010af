//! Durable key-value storage for Tabula.
//!
//! The engine persists two small blobs (the edit overlay and the view settings). This crate
//! exposes:
//! - a reversible text codec (LZ4 + base64) keeping persisted blobs compact
//! - pluggable key-value backends (SQLite, in-memory)
//! - a [`PersistenceStore`] that serializes to JSON, compresses and writes, and degrades to
//!   "absent" when a blob cannot be decoded

mod backend;
pub mod codec;
mod schema;
pub mod store;

pub use backend::{KvBackend, MemoryBackend, SqliteBackend};
pub use codec::{compress, decompress, CodecError};
pub use store::{PersistenceStore, SaveOutcome, StorageError, StoreConfig};
