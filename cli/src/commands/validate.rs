use super::ui::{print_error, print_header, print_issues, print_key_value, print_success};
use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{Settings, ValidationMode};
use agentcfg_core::validator::Bottleneck;
use agentcfg_core::{SchemaValidator, ValidationOptions};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Agent configuration YAML file
    pub file: PathBuf,

    /// development, staging or production (defaults to settings)
    #[arg(long)]
    pub mode: Option<String>,

    /// Print the fallback document when validation fails
    #[arg(long)]
    pub show_fallback: bool,
}

pub async fn handle_validate(settings: &Settings, args: ValidateArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut options = ValidationOptions::from_settings(&settings.validation);
    if let Some(mode) = &args.mode {
        options.mode = mode.parse::<ValidationMode>()?;
    }
    options.generate_fallback = args.show_fallback;

    let result = SchemaValidator::default().validate_yaml(&text, &options);

    print_header(&format!("Validation of {}", args.file.display()));
    print_key_value("Mode", options.mode.as_str());
    print_key_value("Stages", &result.metadata.stages_run.join(", "));
    for bottleneck in &result.metadata.bottlenecks {
        let name = match bottleneck {
            Bottleneck::ContextOverflow => "context overflow",
            Bottleneck::LowMemory => "low memory",
            Bottleneck::TimeoutRisk => "timeout risk",
        };
        print_key_value("Bottleneck", name);
    }
    print_issues(&result.errors, &result.warnings);

    if let Some(fallback) = &result.fallback {
        print_header("Fallback document");
        print!("{}", yaml::to_string(fallback)?);
    }

    if result.valid {
        print_success(&format!("valid ({} warning(s))", result.warnings.len()));
        Ok(())
    } else {
        print_error(&format!("{} error(s)", result.errors.len()));
        anyhow::bail!("{} is not a valid agent configuration", args.file.display())
    }
}
