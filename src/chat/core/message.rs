//! Chat message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::MessageId;

/// A single turn authored by the user or the assistant.
///
/// Only `content` and `is_edited` change after creation, and only through
/// an edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Stable identifier.
    pub id: MessageId,
    /// Text content.
    pub content: String,
    /// `true` for user messages, `false` for assistant replies.
    pub is_user: bool,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Set once the content has been edited.
    #[serde(default)]
    pub is_edited: bool,
}

impl Message {
    /// Build a user message stamped now.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, true)
    }

    /// Build an assistant message stamped now.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, false)
    }

    fn new(content: impl Into<String>, is_user: bool) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            is_user,
            timestamp: Utc::now(),
            is_edited: false,
        }
    }

    /// Replace the content and mark the message as edited.
    pub fn apply_edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.is_edited = true;
    }

    /// Display label of the author.
    #[must_use]
    pub const fn role_label(&self) -> &'static str {
        if self.is_user { "User" } else { "Assistant" }
    }
}
