//! Error types for the chat core.

use thiserror::Error;

/// Chat subsystem error type.
///
/// Store operations never surface these; they come out of constructors and
/// the explicit `try_*` persistence calls.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Failure reported by an inference gateway.
///
/// The `Display` output is what users see after "Sorry, I encountered an
/// error: ", so variants carrying a description print it unadorned.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP client error from Rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// Completion error.
    #[error("completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),
    /// HTTP request error outside of Rig.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The model could not be reached or refused the request.
    #[error("{0}")]
    Unavailable(String),
}
