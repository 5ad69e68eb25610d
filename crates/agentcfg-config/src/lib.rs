//! Configuration types for the agent configuration compiler
//!
//! This crate provides two things:
//! - The typed agent configuration document (`AgentConfiguration`) that is handed to the
//!   external coding agent as YAML. Field names and nesting are a fixed contract.
//! - The `Settings` that tune the compiler itself (cache TTLs, validation mode,
//!   optimization mode), loaded from a file plus `AGENTCFG_*` environment overlays.
//!
//! # Example
//!
//! ```no_run
//! use agentcfg_config::Settings;
//!
//! // Load from default location (.agentcfg.{toml,yml,json}) plus env overlay
//! let settings = Settings::load()?;
//! let ttl = settings.cache.config_ttl_secs;
//! # Ok::<(), agentcfg_config::ConfigError>(())
//! ```

pub mod error;
pub mod loader;
pub mod types;
pub mod validation;

pub use error::{ConfigError, ErrorFormatter, Result};
pub use loader::SettingsBuilder;
pub use types::*;
pub use validation::Validate;
