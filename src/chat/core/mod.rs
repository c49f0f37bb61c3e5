//! Core chat types and identifiers.

pub mod config;
pub mod conversation;
pub mod errors;
pub mod ids;
pub mod message;
pub mod time_ago;

pub use config::{ChatConfig, LlmConfig, StorageConfig, TitleConfig};
pub use conversation::{Conversation, DEFAULT_TITLE};
pub use errors::{ChatError, ChatResult, InferenceError};
pub use ids::{ConversationId, MessageId};
pub use message::Message;
pub use time_ago::time_ago;
