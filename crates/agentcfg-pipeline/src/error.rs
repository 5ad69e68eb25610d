use agentcfg_core::GenerationError;
use thiserror::Error;

/// Anything that can go wrong below the orchestrator
///
/// Never escapes `ConfigOrchestrator`; every variant degrades to the emergency package.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Context integration failed: {0}")]
    ContextIntegration(#[source] anyhow::Error),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to serialize configuration: {0}")]
    Serialization(#[from] agentcfg_config::ConfigError),

    #[error("Malformed webhook payload for '{event}': {source}")]
    Webhook {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown preset '{name}' (expected one of: {expected})")]
    UnknownPreset { name: String, expected: String },

    #[error("Failed to write artifacts: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline panicked: {0}")]
    Panic(String),
}

pub type Result<T> = std::result::Result<T, OrchestrationError>;
