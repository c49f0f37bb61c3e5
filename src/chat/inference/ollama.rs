//! Ollama-backed inference gateway using the Rig provider.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::ollama;
use tracing::debug;

use crate::chat::core::config::LlmConfig;
use crate::chat::core::errors::InferenceError;
use crate::chat::inference::gateway::{InferFuture, InferenceGateway};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Timeout of the readiness probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Completion gateway talking to a local or remote Ollama server.
pub struct OllamaGateway {
    model: ollama::CompletionModel,
    model_name: String,
    temperature: f64,
    max_tokens: Option<u64>,
    base_url: String,
    probe: ReqwestClient,
}

impl OllamaGateway {
    /// Create a gateway from config.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, InferenceError> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(rig::client::Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build()?;
        let model = client.completion_model(config.model.clone());

        let probe = ReqwestClient::builder()
            .connect_timeout(PROBE_TIMEOUT)
            .timeout(PROBE_TIMEOUT)
            .build()?;

        Ok(Self {
            model,
            model_name: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            probe,
        })
    }

    /// Model name requests are sent to.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Base URL of the Ollama server.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the server answers `GET /api/version`.
    pub async fn is_ready(&self) -> bool {
        let url = format!("{}/api/version", self.base_url.trim_end_matches('/'));
        match self.probe.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(%err, "Ollama readiness probe failed");
                false
            }
        }
    }
}

impl InferenceGateway for OllamaGateway {
    fn respond(
        &self,
        instructions: &str,
        input: &str,
    ) -> InferFuture<'_, Result<String, InferenceError>> {
        let instructions = instructions.to_string();
        let input = input.to_string();
        Box::pin(async move {
            let request = self
                .model
                .completion_request(input)
                .preamble(instructions)
                .temperature(self.temperature)
                .max_tokens_opt(self.max_tokens)
                .build();

            let response = self.model.completion(request).await?;
            Ok(extract_text(&response.choice))
        })
    }
}

fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}
