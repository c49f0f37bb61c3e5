//! Inference gateway trait and its implementations.

pub mod gateway;
pub mod ollama;
pub mod scripted;

pub use gateway::{InferFuture, InferenceGateway};
pub use ollama::OllamaGateway;
pub use scripted::{RecordedCall, ScriptedGateway};
