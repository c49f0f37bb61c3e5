//! Conversation store and the text rules it applies.

pub mod chat_store;
pub mod events;
pub mod text;

pub use chat_store::{ChatStore, StoreSettings};
pub use events::StoreEvent;
pub use text::{error_reply, fallback_title, strip_code_fences, title_prompt};
