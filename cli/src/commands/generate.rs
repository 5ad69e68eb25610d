use super::ui::{print_error, print_header, print_key_value, print_success, print_warning};
use super::OutputFormat;
use agentcfg_config::{OptimizationMode, PerformanceProfile, Settings};
use agentcfg_core::generator::IssueContext;
use agentcfg_core::{ProblemContext, RawEnvironment};
use agentcfg_pipeline::{ConfigOrchestrator, ConfigPackage, OrchestratorOptions, Preset};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

const EVENT_PATH_VAR: &str = "GITHUB_EVENT_PATH";
const EVENT_NAME_VAR: &str = "GITHUB_EVENT_NAME";

#[derive(Args)]
pub struct GenerateArgs {
    /// Webhook event name (defaults to GITHUB_EVENT_NAME)
    #[arg(long)]
    pub event: Option<String>,

    /// Webhook payload JSON file (defaults to GITHUB_EVENT_PATH)
    #[arg(long, value_name = "FILE")]
    pub payload: Option<PathBuf>,

    /// Task preset: issue_analysis, pr_review, code_fix or test_generation
    #[arg(long)]
    pub preset: Option<String>,

    /// Issue number when no payload is available
    #[arg(long)]
    pub issue: Option<u64>,

    /// Issue title when no payload is available
    #[arg(long)]
    pub title: Option<String>,

    /// Issue body when no payload is available
    #[arg(long)]
    pub body: Option<String>,

    /// Issue label (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Skip the optimizer
    #[arg(long)]
    pub no_optimize: bool,

    /// Optimization mode (defaults to settings)
    #[arg(long)]
    pub mode: Option<String>,

    /// Performance profile: fast, balanced or thorough
    #[arg(long)]
    pub profile: Option<String>,

    /// Write the config, env file and deployment notes into this directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

impl GenerateArgs {
    fn orchestrator_options(&self, settings: &Settings) -> Result<OrchestratorOptions> {
        let mut options = OrchestratorOptions::from_settings(settings);
        if let Some(preset) = &self.preset {
            options.preset = Some(preset.parse::<Preset>()?);
        }
        if self.no_optimize {
            options.optimize = false;
        }
        if let Some(mode) = &self.mode {
            options.optimization.mode = mode.parse::<OptimizationMode>()?;
        }
        if let Some(profile) = &self.profile {
            options.optimization.profile = Some(profile.parse::<PerformanceProfile>()?);
        }
        Ok(options)
    }

    fn problem(&self) -> ProblemContext {
        match &self.title {
            Some(title) => ProblemContext {
                issue: Some(IssueContext {
                    number: self.issue.unwrap_or_default(),
                    title: title.clone(),
                    body: self.body.clone(),
                    labels: self.labels.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            None => ProblemContext::default(),
        }
    }
}

pub async fn handle_generate(settings: &Settings, args: GenerateArgs) -> Result<()> {
    let options = args.orchestrator_options(settings)?;
    let env = RawEnvironment::from_process();
    let orchestrator = ConfigOrchestrator::new(settings.clone());

    let payload_path = args
        .payload
        .clone()
        .or_else(|| env.get(EVENT_PATH_VAR).map(PathBuf::from));
    let event = args
        .event
        .clone()
        .or_else(|| env.get(EVENT_NAME_VAR).map(str::to_string));

    let package = match (payload_path, event) {
        (Some(path), Some(event)) if args.title.is_none() => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read payload {}", path.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Payload {} is not JSON", path.display()))?;
            info!(event = %event, payload = %path.display(), "Generating from webhook payload");
            orchestrator
                .handle_webhook_configuration(&event, &payload, env, &options)
                .await
        }
        _ => {
            let plan = orchestrator
                .prepare_orchestration_configuration(env, &args.problem(), &options)
                .await;
            for (key, value) in &plan.outputs {
                info!(key = %key, value = %value, "Step output");
            }
            plan.package
        }
    };

    match &args.output_dir {
        Some(dir) => {
            report(&package);
            let written = package.write_to(dir).await?;
            for path in written {
                print_success(&format!("wrote {}", path.display()));
            }
        }
        None => {
            if package.is_emergency() {
                print_error(package.metadata.error.as_deref().unwrap_or("pipeline failed"));
            }
            match args.format {
                OutputFormat::Yaml => print!("{}", package.yaml_text),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&package.config)?)
                }
            }
        }
    }
    Ok(())
}

fn report(package: &ConfigPackage) {
    let meta = &package.metadata;
    if package.is_emergency() {
        print_error(&format!(
            "pipeline failed, emitting emergency configuration: {}",
            meta.error.as_deref().unwrap_or("unknown error")
        ));
    }
    if meta.fallback && !meta.error_fallback {
        print_warning("validation failed, emitting fallback configuration");
    }
    for warning in &meta.warnings {
        print_warning(warning);
    }
    print_header("Generated configuration");
    print_key_value("Provider", &meta.provider);
    print_key_value("Model", &meta.model);
    print_key_value("Problem type", &meta.problem_type);
    print_key_value("Preset", meta.preset.as_deref().unwrap_or("none"));
    print_key_value("Cached", &meta.cached.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: GenerateArgs,
    }

    fn parse(argv: &[&str]) -> GenerateArgs {
        Harness::parse_from(std::iter::once("agentcfg").chain(argv.iter().copied())).args
    }

    #[test]
    fn flags_override_settings() {
        let args = parse(&["--preset", "pr-review", "--mode", "aggressive", "--no-optimize"]);
        let options = args.orchestrator_options(&Settings::default()).unwrap();
        assert_eq!(options.preset, Some(Preset::PrReview));
        assert_eq!(options.optimization.mode, OptimizationMode::Aggressive);
        assert!(!options.optimize);
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let args = parse(&["--preset", "refactor"]);
        assert!(args.orchestrator_options(&Settings::default()).is_err());
    }

    #[test]
    fn issue_flags_build_a_problem() {
        let args = parse(&["--issue", "5", "--title", "Flaky upload", "--label", "bug"]);
        let problem = args.problem();
        let issue = problem.issue.unwrap();
        assert_eq!(issue.number, 5);
        assert_eq!(issue.labels, vec!["bug".to_string()]);
        assert!(parse(&[]).problem().is_empty());
    }
}
