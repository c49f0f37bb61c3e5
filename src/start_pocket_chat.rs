//! Startup helpers for the pocket-chat terminal client.
//!
//! Reads config from the environment, opens the `SQLite` store, picks an
//! inference backend and hands stdin/stdout to the chat loop.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::BufReader;

use crate::chat::core::config::ChatConfig;
use crate::chat::inference::{InferenceGateway, OllamaGateway, ScriptedGateway};
use crate::chat::storage::{ConversationPersistence, SqliteKeyValueStore};
use crate::chat::store::{ChatStore, StoreSettings};
use crate::cli::run_repl;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Run the terminal client (used by the `pocket-chat` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` when the loop ends normally, `1` on startup failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting pocket-chat v{}", env!("CARGO_PKG_VERSION"));

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let outcome = rt.block_on(run_session(config));
    // A pending stdin read would otherwise keep the runtime alive.
    rt.shutdown_timeout(SHUTDOWN_GRACE);

    if let Err(e) = outcome {
        tracing::error!("Chat session failed: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Open the store described by `config`.
///
/// # Errors
/// Returns an error if the database cannot be opened or the gateway cannot be built.
pub async fn initialize(config: &ChatConfig) -> Result<ChatStore> {
    let kv = SqliteKeyValueStore::new(&config.storage)
        .await
        .with_context(|| format!("opening {}", config.storage.sqlite_path.display()))?;
    let persistence = ConversationPersistence::new(Arc::new(kv), &config.storage);
    let gateway = build_gateway(config).await?;

    Ok(ChatStore::open(persistence, gateway, StoreSettings::from_config(config)).await)
}

/// Pick the inference backend: the offline echo gateway, or Ollama.
///
/// # Errors
/// Returns an error if the Ollama client cannot be built.
pub async fn build_gateway(config: &ChatConfig) -> Result<Arc<dyn InferenceGateway>> {
    if config.offline {
        tracing::info!("Offline mode: replies are echoed locally");
        return Ok(Arc::new(ScriptedGateway::echo()));
    }

    let gateway = OllamaGateway::new(&config.llm).context("building Ollama client")?;
    tracing::info!(
        "Ollama endpoint: {} (model {})",
        gateway.base_url(),
        gateway.model_name()
    );
    if !gateway.is_ready().await {
        tracing::warn!(
            "Ollama is not answering at {}; replies will carry the error until it is",
            gateway.base_url()
        );
    }
    Ok(Arc::new(gateway))
}

async fn run_session(config: ChatConfig) -> Result<()> {
    let store = initialize(&config).await?;
    let input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();

    tokio::select! {
        result = run_repl(&store, input, &mut output) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            tracing::info!("Interrupted, waiting for outstanding replies");
            store.wait_idle().await;
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}
