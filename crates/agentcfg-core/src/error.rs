//! Error taxonomy of the pipeline stages

use serde::Serialize;
use thiserror::Error;

/// Missing or malformed environment input
///
/// Recorded in `MappingResult::errors`; the mapper never returns these as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingError {
    #[error("Missing required secret {name} for provider {provider}")]
    MissingSecret { name: String, provider: String },

    #[error("Missing required secret {name} for {deployment} deployment")]
    MissingDeploymentSecret { name: String, deployment: String },

    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    #[error("Unknown provider override '{value}'")]
    UnknownProvider { value: String },
}

/// Unrecoverable generator precondition failure
///
/// Only produced when fallback mode is disabled.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Repository identity is missing (expected owner/name from context or GITHUB_REPOSITORY)")]
    MissingRepository,

    #[error("Repository identity '{value}' is not in owner/name form")]
    InvalidRepository { value: String },

    #[error("Failed to serialize configuration: {0}")]
    Serialization(#[from] agentcfg_config::ConfigError),
}
