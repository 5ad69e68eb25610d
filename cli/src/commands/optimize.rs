use super::ui::{print_header, print_key_value, print_success};
use super::OutputFormat;
use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{AgentConfiguration, OptimizationMode, PerformanceProfile, Settings};
use agentcfg_core::{CostPerformanceOptimizer, OptimizationOptions};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use yansi::Paint;

#[derive(Args)]
pub struct OptimizeArgs {
    /// Agent configuration YAML file
    pub file: PathBuf,

    /// aggressive, conservative, balanced, cost_focused or performance_focused
    #[arg(long)]
    pub mode: Option<String>,

    /// Performance profile: fast, balanced or thorough
    #[arg(long)]
    pub profile: Option<String>,

    /// Also apply strategies that are recommendation-only by default
    #[arg(long)]
    pub apply_manual: bool,

    /// Print only the optimized document
    #[arg(short, long)]
    pub quiet: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

pub async fn handle_optimize(settings: &Settings, args: OptimizeArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let config: AgentConfiguration = yaml::parse(&text)?;

    let mut options = OptimizationOptions::from_settings(&settings.optimization);
    if let Some(mode) = &args.mode {
        options.mode = mode.parse::<OptimizationMode>()?;
    }
    if let Some(profile) = &args.profile {
        options.profile = Some(profile.parse::<PerformanceProfile>()?);
    }
    options.apply_manual |= args.apply_manual;
    options.use_cache = false;

    let result = CostPerformanceOptimizer::default().optimize_configuration(&config, &options);

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !args.quiet {
        print_header(&format!("Optimization of {} ({})", args.file.display(), options.mode));
        for rec in &result.recommendations {
            let marker = if rec.applied {
                "applied".green().bold()
            } else {
                "manual".yellow().bold()
            };
            println!(
                "  {:>2}. {} [{}] {} (potential {:.2}, saves ${:.4})",
                rec.priority,
                rec.strategy.as_str().cyan(),
                marker,
                rec.rationale,
                rec.potential,
                rec.estimated_saving
            );
        }
        let cost = &result.cost_impact;
        print_key_value(
            "Cost",
            &format!(
                "${:.4} -> ${:.4} ({:.1}% saved)",
                cost.before, cost.after, cost.saving_pct
            ),
        );
        let perf = &result.performance_impact;
        print_key_value(
            "Performance score",
            &format!("{:.2} -> {:.2}", perf.before_score, perf.after_score),
        );
        print_key_value(
            "Max run time",
            &format!("{}s -> {}s", perf.max_run_secs_before, perf.max_run_secs_after),
        );
        print_success(&format!(
            "{} of {} recommendation(s) applied",
            result.metadata.applied.len(),
            result.recommendations.len()
        ));
        println!();
    }

    print!("{}", yaml::to_string(&result.optimized_config)?);
    Ok(())
}
