//! Chat core: conversation model, persistence, inference and the store.
//!
//! ## Layout
//! - `core`: ids, messages, conversations, config, errors
//! - `storage`: key-value backends and the persistence gateway
//! - `inference`: the completion gateway trait and its backends
//! - `store`: the single owner of chat state

pub mod core;
pub mod inference;
pub mod storage;
pub mod store;

pub use self::core::{
    ChatConfig, ChatError, ChatResult, Conversation, ConversationId, InferenceError, Message,
    MessageId,
};
pub use inference::{InferenceGateway, OllamaGateway, ScriptedGateway};
pub use storage::{ConversationPersistence, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use store::{ChatStore, StoreEvent, StoreSettings};
