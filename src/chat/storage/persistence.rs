//! Persistence gateway for the conversation list and the system prompt.
//!
//! The whole list is encoded as one JSON array and written to a single key
//! on every save. There is no incremental update and no schema version;
//! older payloads load through serde defaults on optional fields.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::core::config::StorageConfig;
use crate::chat::core::conversation::Conversation;
use crate::chat::core::errors::ChatResult;
use crate::chat::storage::kv_store::KeyValueStore;

/// Reads and writes chat state through a [`KeyValueStore`].
#[derive(Clone)]
pub struct ConversationPersistence {
    kv: Arc<dyn KeyValueStore>,
    conversations_key: String,
    system_prompt_key: String,
}

impl ConversationPersistence {
    /// Create a gateway using the keys named in `config`.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, config: &StorageConfig) -> Self {
        Self {
            kv,
            conversations_key: config.conversations_key.clone(),
            system_prompt_key: config.system_prompt_key.clone(),
        }
    }

    /// Encode and write the full list, logging failures.
    pub async fn save(&self, conversations: &[Conversation]) {
        if let Err(err) = self.try_save(conversations).await {
            warn!(?err, "Failed to save conversations");
        }
    }

    /// Encode and write the full list.
    ///
    /// # Errors
    /// Returns an error if encoding or the write fails.
    pub async fn try_save(&self, conversations: &[Conversation]) -> ChatResult<()> {
        let encoded = serde_json::to_string(conversations)?;
        self.kv.set(&self.conversations_key, encoded).await?;
        debug!(count = conversations.len(), "Saved conversations");
        Ok(())
    }

    /// Load the saved list; missing or unreadable data yields an empty list.
    pub async fn load(&self) -> Vec<Conversation> {
        match self.try_load().await {
            Ok(Some(conversations)) => conversations,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(?err, "Failed to load conversations, starting empty");
                Vec::new()
            }
        }
    }

    /// Load the saved list, distinguishing "never saved" from failures.
    ///
    /// # Errors
    /// Returns an error if the read fails or the payload cannot be decoded.
    pub async fn try_load(&self) -> ChatResult<Option<Vec<Conversation>>> {
        let Some(encoded) = self.kv.get(&self.conversations_key).await? else {
            return Ok(None);
        };
        let conversations: Vec<Conversation> = serde_json::from_str(&encoded)?;
        debug!(count = conversations.len(), "Loaded conversations");
        Ok(Some(conversations))
    }

    /// Saved system prompt, if one was stored.
    pub async fn load_system_prompt(&self) -> Option<String> {
        match self.kv.get(&self.system_prompt_key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(?err, "Failed to load system prompt");
                None
            }
        }
    }

    /// Store the system prompt, logging failures.
    pub async fn save_system_prompt(&self, prompt: &str) {
        if let Err(err) = self
            .kv
            .set(&self.system_prompt_key, prompt.to_string())
            .await
        {
            warn!(?err, "Failed to save system prompt");
        }
    }

    /// Delete the stored system prompt, logging failures.
    pub async fn clear_system_prompt(&self) {
        if let Err(err) = self.kv.remove(&self.system_prompt_key).await {
            warn!(?err, "Failed to clear system prompt");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::errors::ChatError;
    use crate::chat::core::message::Message;
    use crate::chat::storage::kv_store::{MemoryKeyValueStore, StoreFuture};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> StoreFuture<'_, ChatResult<Option<String>>> {
            Box::pin(async { Err(ChatError::InvalidConfig("offline".to_string())) })
        }

        fn set(&self, _key: &str, _value: String) -> StoreFuture<'_, ChatResult<()>> {
            Box::pin(async { Err(ChatError::InvalidConfig("offline".to_string())) })
        }

        fn remove(&self, _key: &str) -> StoreFuture<'_, ChatResult<()>> {
            Box::pin(async { Err(ChatError::InvalidConfig("offline".to_string())) })
        }
    }

    fn gateway(kv: &MemoryKeyValueStore) -> ConversationPersistence {
        ConversationPersistence::new(Arc::new(kv.clone()), &StorageConfig::default())
    }

    fn sample_list() -> Vec<Conversation> {
        let mut first = Conversation::new();
        first.title = "Capitals".to_string();
        first.messages.push(Message::user("What is the capital of the UK?"));
        first.messages.push(Message::assistant("London."));
        let mut edited = Message::user("typo");
        edited.apply_edit("fixed");
        let mut second = Conversation::new();
        second.messages.push(edited);
        vec![first, second, Conversation::new()]
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let kv = MemoryKeyValueStore::new();
        let persistence = gateway(&kv);
        let list = sample_list();

        persistence.save(&list).await;
        assert_eq!(persistence.load().await, list);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_value() {
        let kv = MemoryKeyValueStore::new();
        let persistence = gateway(&kv);

        persistence.save(&sample_list()).await;
        persistence.save(&[]).await;
        assert!(persistence.load().await.is_empty());
        assert_eq!(kv.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let kv = MemoryKeyValueStore::new();
        let persistence = gateway(&kv);
        assert!(persistence.try_load().await.unwrap().is_none());
        assert!(persistence.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_empty() {
        let kv = MemoryKeyValueStore::new();
        kv.set("savedConversations", "{not json".to_string())
            .await
            .unwrap();
        let persistence = gateway(&kv);

        assert!(persistence.try_load().await.is_err());
        assert!(persistence.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let persistence =
            ConversationPersistence::new(Arc::new(FailingStore), &StorageConfig::default());

        persistence.save(&sample_list()).await;
        assert!(persistence.try_save(&[]).await.is_err());
        assert!(persistence.load().await.is_empty());
        assert_eq!(persistence.load_system_prompt().await, None);
        persistence.save_system_prompt("ignored").await;
        persistence.clear_system_prompt().await;
    }

    #[tokio::test]
    async fn test_system_prompt_uses_its_own_key() {
        let kv = MemoryKeyValueStore::new();
        let persistence = gateway(&kv);

        persistence.save(&sample_list()).await;
        persistence.save_system_prompt("Answer in French.").await;
        assert_eq!(
            persistence.load_system_prompt().await.as_deref(),
            Some("Answer in French.")
        );
        assert_eq!(persistence.load().await.len(), 3);

        persistence.clear_system_prompt().await;
        assert_eq!(persistence.load_system_prompt().await, None);
        assert_eq!(persistence.load().await.len(), 3);
    }
}
