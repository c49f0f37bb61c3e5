//! Inference gateway abstraction.

use std::future::Future;
use std::pin::Pin;

use crate::chat::core::errors::InferenceError;

/// Boxed future type for inference operations.
pub type InferFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over a text generation backend.
///
/// One call, one reply: no streaming, no cancellation, no timeout beyond
/// whatever the backend enforces itself.
pub trait InferenceGateway: Send + Sync {
    /// Generate a reply to `input` under `instructions`.
    ///
    /// # Errors
    /// Returns an error if the backend fails to produce a reply.
    fn respond(
        &self,
        instructions: &str,
        input: &str,
    ) -> InferFuture<'_, Result<String, InferenceError>>;
}
