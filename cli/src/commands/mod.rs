pub mod generate;
pub mod optimize;
pub mod presets;
pub mod providers;
pub mod ui;
pub mod validate;

pub use generate::{handle_generate, GenerateArgs};
pub use optimize::{handle_optimize, OptimizeArgs};
pub use presets::handle_presets;
pub use providers::handle_providers;
pub use validate::{handle_validate, ValidateArgs};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agentcfg")]
#[command(about = "Compile validated, cost-tuned configurations for AI coding agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to .agentcfg.{toml,yml,yaml,json})
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overrides settings and RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a configuration package from the process environment
    Generate(GenerateArgs),
    /// Validate an agent configuration document
    Validate(ValidateArgs),
    /// Analyse and optimize an agent configuration document
    Optimize(OptimizeArgs),
    /// List providers, their models and key status in this environment
    Providers,
    /// List task presets
    Presets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}
