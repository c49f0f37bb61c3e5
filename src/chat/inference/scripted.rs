//! Deterministic gateways for offline use and tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::chat::core::errors::InferenceError;
use crate::chat::inference::gateway::{InferFuture, InferenceGateway};
use crate::chat::store::text::TITLE_PROMPT_PREFIX;

type Responder = dyn Fn(&str, &str) -> Result<String, InferenceError> + Send + Sync;

/// One recorded gateway call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    /// Instructions passed to the gateway.
    pub instructions: String,
    /// Input passed to the gateway.
    pub input: String,
}

/// Gateway answering through a closure, optionally after a fixed delay.
pub struct ScriptedGateway {
    responder: Box<Responder>,
    delay: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    /// Answer every call with `responder(instructions, input)`.
    #[must_use]
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, InferenceError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Offline stand-in: echoes input and titles a chat with its first words.
    #[must_use]
    pub fn echo() -> Self {
        Self::new(|_, input| {
            if let Some(text) = input.strip_prefix(TITLE_PROMPT_PREFIX) {
                let title: Vec<&str> = text.split_whitespace().take(6).collect();
                return Ok(title.join(" "));
            }
            Ok(format!("You said: {input}"))
        })
    }

    /// Fail every call with `description`.
    #[must_use]
    pub fn failing(description: impl Into<String>) -> Self {
        let description = description.into();
        Self::new(move |_, _| Err(InferenceError::Unavailable(description.clone())))
    }

    /// Wait `delay` before answering each call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl InferenceGateway for ScriptedGateway {
    fn respond(
        &self,
        instructions: &str,
        input: &str,
    ) -> InferFuture<'_, Result<String, InferenceError>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                instructions: instructions.to_string(),
                input: input.to_string(),
            });
        let result = (self.responder)(instructions, input);
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_gateway_records_calls() {
        let gateway = ScriptedGateway::new(|instructions, input| {
            Ok(format!("{instructions}|{input}"))
        });
        let reply = gateway.respond("be brief", "hello").await.unwrap();
        assert_eq!(reply, "be brief|hello");
        assert_eq!(
            gateway.calls(),
            vec![RecordedCall {
                instructions: "be brief".to_string(),
                input: "hello".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_gateway_describes_error() {
        let gateway = ScriptedGateway::failing("network unreachable");
        let err = gateway.respond("", "test").await.unwrap_err();
        assert_eq!(err.to_string(), "network unreachable");
    }

    #[tokio::test]
    async fn test_echo_gateway_titles_and_replies() {
        let gateway = ScriptedGateway::echo();
        let title = gateway
            .respond(
                "",
                &format!("{TITLE_PROMPT_PREFIX}how do rust lifetimes work in practice today"),
            )
            .await
            .unwrap();
        assert_eq!(title, "how do rust lifetimes work in");

        let reply = gateway.respond("", "ping").await.unwrap();
        assert_eq!(reply, "You said: ping");
    }

    #[tokio::test]
    async fn test_delay_is_applied() {
        let gateway = ScriptedGateway::echo().with_delay(Duration::from_millis(30));
        let start = std::time::Instant::now();
        gateway.respond("", "ping").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
