//! Change notifications published by the conversation store.

use crate::chat::core::ids::{ConversationId, MessageId};

/// A change applied by the store.
///
/// Events are published after the change has been persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// A conversation was created and prepended.
    ConversationCreated(ConversationId),
    /// A conversation was removed.
    ConversationDeleted(ConversationId),
    /// A conversation lost its messages and title.
    ConversationCleared(ConversationId),
    /// The selection moved (or was cleared).
    SelectionChanged(Option<ConversationId>),
    /// A message was appended to a conversation.
    MessageAppended {
        /// Conversation receiving the message.
        conversation_id: ConversationId,
        /// The new message.
        message_id: MessageId,
        /// Whether the user authored it.
        is_user: bool,
    },
    /// A message was edited and everything after it dropped.
    MessageEdited {
        /// Conversation holding the message.
        conversation_id: ConversationId,
        /// The edited message.
        message_id: MessageId,
    },
    /// A conversation received a new title.
    TitleUpdated {
        /// Retitled conversation.
        conversation_id: ConversationId,
        /// The new title.
        title: String,
    },
    /// The loading flag of the selected conversation flipped.
    LoadingChanged(bool),
    /// The system prompt was replaced or reset.
    SystemPromptChanged,
}
