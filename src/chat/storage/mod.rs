//! Storage backends and the persistence gateway.

pub mod kv_store;
pub mod persistence;

pub use kv_store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreFuture};
pub use persistence::ConversationPersistence;
