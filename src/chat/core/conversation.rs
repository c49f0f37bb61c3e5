//! Conversation model.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::core::message::Message;

/// Title given to new and cleared conversations.
pub const DEFAULT_TITLE: &str = "New Chat";

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// A titled, ordered sequence of messages.
///
/// Messages are kept in append order; the only ways to shorten the list are
/// [`Conversation::truncate_after`] and [`Conversation::reset`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Stable identifier.
    pub id: ConversationId,
    /// Display title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create an empty conversation titled [`DEFAULT_TITLE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            title: default_title(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Position of a message by id.
    #[must_use]
    pub fn position_of(&self, message_id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    /// Drop every message after `index`, keeping `index` itself.
    pub fn truncate_after(&mut self, index: usize) {
        self.messages.truncate(index.saturating_add(1));
    }

    /// Remove all messages and restore the default title.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.title = default_title();
    }

    /// Plain-text transcript suitable for sharing.
    #[must_use]
    pub fn transcript(&self) -> String {
        let mut text = format!("Chat: {}\n\n", self.title);
        for message in &self.messages {
            let edited = if message.is_edited { " (edited)" } else { "" };
            let _ = write!(
                text,
                "{}{edited}: {}\n\n",
                message.role_label(),
                message.content
            );
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conversation {
        let mut conversation = Conversation::new();
        conversation.messages.push(Message::user("one"));
        conversation.messages.push(Message::assistant("two"));
        conversation.messages.push(Message::user("three"));
        conversation
    }

    #[test]
    fn test_new_conversation_is_empty() {
        let conversation = Conversation::new();
        assert_eq!(conversation.title, "New Chat");
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn test_truncate_after_keeps_pivot() {
        let mut conversation = sample();
        conversation.truncate_after(1);
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[1].content, "two");
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut conversation = sample();
        conversation.title = "Greetings".to_string();
        let id = conversation.id;
        conversation.reset();
        assert_eq!(conversation.id, id);
        assert_eq!(conversation.title, DEFAULT_TITLE);
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn test_position_of_finds_message() {
        let conversation = sample();
        let id = conversation.messages[2].id;
        assert_eq!(conversation.position_of(id), Some(2));
        assert_eq!(conversation.position_of(MessageId::new()), None);
    }

    #[test]
    fn test_transcript_format() {
        let mut conversation = Conversation::new();
        conversation.title = "Capitals".to_string();
        let mut question = Message::user("Capital of France?");
        question.apply_edit("Capital of the UK?");
        conversation.messages.push(question);
        conversation.messages.push(Message::assistant("London."));

        assert_eq!(
            conversation.transcript(),
            "Chat: Capitals\n\nUser (edited): Capital of the UK?\n\nAssistant: London.\n\n"
        );
    }

    #[test]
    fn test_lenient_decoding_fills_defaults() {
        let json = r#"{
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "createdAt": "2025-06-10T12:00:00Z"
        }"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.title, DEFAULT_TITLE);
        assert!(conversation.messages.is_empty());
    }
}
