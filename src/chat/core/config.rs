//! Configuration for the chat client.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable overriding the `SQLite` database path.
pub const DB_PATH_ENV: &str = "POCKET_CHAT_DB";
/// Environment variable overriding the Ollama base URL.
pub const OLLAMA_URL_ENV: &str = "POCKET_CHAT_OLLAMA_URL";
/// Environment variable overriding the completion model.
pub const MODEL_ENV: &str = "POCKET_CHAT_MODEL";
/// Environment variable overriding the sampling temperature.
pub const TEMPERATURE_ENV: &str = "POCKET_CHAT_TEMPERATURE";
/// Environment variable switching to the offline echo gateway.
pub const OFFLINE_ENV: &str = "POCKET_CHAT_OFFLINE";

/// System prompt used when none has been saved.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Instructions sent with title requests.
pub const DEFAULT_TITLE_INSTRUCTIONS: &str = "Generate a concise, descriptive title (max 50 characters) for a conversation that starts with this message. Return only the title text, no additional formatting or explanation.";

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Storage settings.
    pub storage: StorageConfig,
    /// Completion model settings.
    pub llm: LlmConfig,
    /// Title generation settings.
    pub title: TitleConfig,
    /// System prompt used until the user saves one.
    pub default_system_prompt: String,
    /// Use the offline echo gateway instead of Ollama.
    pub offline: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            llm: LlmConfig::default(),
            title: TitleConfig::default(),
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            offline: false,
        }
    }
}

impl ChatConfig {
    /// Build the default configuration with environment overrides applied.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DB_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(url) = lookup(OLLAMA_URL_ENV) {
            config.llm.base_url = Some(url);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.llm.model = model;
        }
        if let Some(raw) = lookup(TEMPERATURE_ENV) {
            config.llm.temperature = raw.trim().parse().map_err(|_| {
                ChatError::InvalidConfig(format!("{TEMPERATURE_ENV} is not a number: {raw}"))
            })?;
        }
        if let Some(raw) = lookup(OFFLINE_ENV) {
            config.offline = matches!(raw.trim(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if !is_sql_identifier(&self.storage.kv_table) {
            return Err(ChatError::InvalidConfig(format!(
                "storage.kv_table must be a plain identifier, got {:?}",
                self.storage.kv_table
            )));
        }

        if self.storage.conversations_key.is_empty() || self.storage.system_prompt_key.is_empty()
        {
            return Err(ChatError::InvalidConfig(
                "storage keys must not be empty".to_string(),
            ));
        }

        if self.storage.conversations_key == self.storage.system_prompt_key {
            return Err(ChatError::InvalidConfig(
                "storage.conversations_key and storage.system_prompt_key must differ".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ChatError::InvalidConfig(
                "llm.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.title.fallback_max_chars == 0 {
            return Err(ChatError::InvalidConfig(
                "title.fallback_max_chars must be > 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url)?;
        }

        Ok(())
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Key-value table name.
    pub kv_table: String,
    /// Key holding the encoded conversation list.
    pub conversations_key: String,
    /// Key holding the saved system prompt.
    pub system_prompt_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("pocket_chat.sqlite"),
            kv_table: "kv_store".to_string(),
            conversations_key: "savedConversations".to_string(),
            system_prompt_key: "systemPrompt".to_string(),
        }
    }
}

/// Completion model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama completion model name.
    pub model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Optional max tokens.
    pub max_tokens: Option<u64>,
    /// Optional custom base URL.
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "ministral-3:8b-instruct-2512-q8_0".to_string(),
            temperature: 0.4,
            max_tokens: None,
            base_url: None,
        }
    }
}

/// Title generation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Instructions sent with the title request.
    pub instructions: String,
    /// Characters kept by the local fallback title.
    pub fallback_max_chars: usize,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_TITLE_INSTRUCTIONS.to_string(),
            fallback_max_chars: 50,
        }
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = ChatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_system_prompt, "You are a helpful assistant.");
        assert_eq!(config.storage.conversations_key, "savedConversations");
        assert_eq!(config.storage.system_prompt_key, "systemPrompt");
        assert_eq!(config.title.fallback_max_chars, 50);
    }

    #[test]
    fn test_config_from_lookup_applies_overrides() {
        let config = ChatConfig::from_lookup(|name| match name {
            DB_PATH_ENV => Some("/tmp/chat.sqlite".to_string()),
            OLLAMA_URL_ENV => Some("http://10.0.0.2:11434".to_string()),
            MODEL_ENV => Some("llama3.2".to_string()),
            TEMPERATURE_ENV => Some("0.9".to_string()),
            OFFLINE_ENV => Some("1".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/chat.sqlite"));
        assert_eq!(config.llm.base_url.as_deref(), Some("http://10.0.0.2:11434"));
        assert_eq!(config.llm.model, "llama3.2");
        assert!((config.llm.temperature - 0.9).abs() < f64::EPSILON);
        assert!(config.offline);
    }

    #[test]
    fn test_config_rejects_bad_temperature() {
        let result = ChatConfig::from_lookup(|name| {
            (name == TEMPERATURE_ENV).then(|| "warm".to_string())
        });
        assert!(matches!(result, Err(ChatError::InvalidConfig(_))));

        let mut config = ChatConfig::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_url() {
        let mut config = ChatConfig::default();
        config.llm.base_url = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(ChatError::Url(_))));
    }

    #[test]
    fn test_config_rejects_unsafe_table_name() {
        let mut config = ChatConfig::default();
        config.storage.kv_table = "kv; DROP TABLE x".to_string();
        assert!(config.validate().is_err());

        config.storage.kv_table = "_kv2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_shared_keys() {
        let mut config = ChatConfig::default();
        config.storage.system_prompt_key = config.storage.conversations_key.clone();
        assert!(config.validate().is_err());
    }
}
