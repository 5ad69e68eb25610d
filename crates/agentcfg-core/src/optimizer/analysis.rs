//! Static analysis of a configuration: cost, performance, resources, efficiency, bottlenecks
//!
//! Every report is a pure function of the document and the provider catalogue.

use crate::providers::{self, IterationTokens};
use crate::validator::performance::{
    MAX_RUN_SECS, MAX_USEFUL_CPUS, MIN_MEMORY_MB, WINDOW_OVERFLOW_RATIO,
};
use crate::validator::Bottleneck;
use agentcfg_config::{AgentConfiguration, Deployment, TOOL_CALLING_PARSER};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysis {
    pub model: String,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    pub tokens_per_iteration: IterationTokens,
    pub cost_per_iteration: f64,
    pub estimated_total: f64,
    pub cost_limit: Option<f64>,
    /// `estimated_total / cost_limit`
    pub budget_utilization: Option<f64>,
    /// Economy model of the same provider, when cheaper than the current one
    pub cheaper_model: Option<String>,
    pub cheaper_estimated_total: Option<f64>,
}

impl CostAnalysis {
    pub fn over_budget(&self) -> bool {
        self.budget_utilization.is_some_and(|u| u > 1.0)
    }
}

/// Scores are in `0.0..=1.0`, higher is better
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
    /// Worst-case wall time: `timeout * max_iterations`
    pub max_run_secs: u64,
    pub timeout_score: f64,
    pub iteration_score: f64,
    pub memory_score: f64,
    pub cpu_score: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceAnalysis {
    pub deployment: &'static str,
    pub memory_mb: Option<u64>,
    pub cpus: Option<f64>,
    pub memory_per_cpu_mb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyAnalysis {
    pub tool_count: usize,
    /// `window_size / max_tokens`
    pub context_ratio: f64,
    pub parser_consistent: bool,
    pub supports_prompt_cache: bool,
    pub tool_score: f64,
    pub context_score: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BottleneckAnalysis {
    pub bottlenecks: Vec<Bottleneck>,
    pub details: Vec<String>,
}

impl BottleneckAnalysis {
    pub fn has(&self, bottleneck: Bottleneck) -> bool {
        self.bottlenecks.contains(&bottleneck)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigAnalysis {
    pub cost: CostAnalysis,
    pub performance: PerformanceAnalysis,
    pub resources: ResourceAnalysis,
    pub efficiency: EfficiencyAnalysis,
    pub bottlenecks: BottleneckAnalysis,
}

pub fn analyze(config: &AgentConfiguration) -> ConfigAnalysis {
    ConfigAnalysis {
        cost: analyze_cost(config),
        performance: analyze_performance(config),
        resources: analyze_resources(config),
        efficiency: analyze_efficiency(config),
        bottlenecks: detect_bottlenecks(config),
    }
}

pub fn analyze_cost(config: &AgentConfiguration) -> CostAnalysis {
    let agent = &config.agent;
    let (input_per_1k, output_per_1k) =
        providers::model_rates(&agent.model.name, agent.model.provider);
    let per_iteration = providers::estimate_iteration_cost(agent);
    let estimated_total = per_iteration * agent.max_iterations as f64;

    let (cheaper_model, cheaper_estimated_total) = economy_alternative(config)
        .map(|(name, total)| (Some(name), Some(total)))
        .unwrap_or((None, None));

    CostAnalysis {
        model: agent.model.name.clone(),
        input_per_1k,
        output_per_1k,
        tokens_per_iteration: providers::iteration_tokens(agent),
        cost_per_iteration: per_iteration,
        estimated_total,
        cost_limit: agent.cost_limit,
        budget_utilization: agent
            .cost_limit
            .filter(|limit| *limit > 0.0)
            .map(|limit| estimated_total / limit),
        cheaper_model,
        cheaper_estimated_total,
    }
}

/// Economy model of the provider, keeping any `<provider>/` prefix of the current name
fn economy_alternative(config: &AgentConfiguration) -> Option<(String, f64)> {
    let agent = &config.agent;
    let economy = providers::profile(agent.model.provider).economy_model?;
    let bare_economy = economy.rsplit('/').next().unwrap_or(economy);
    let bare_current = agent.model.name.rsplit('/').next().unwrap_or(&agent.model.name);
    if bare_current.eq_ignore_ascii_case(bare_economy) {
        return None;
    }

    let name = match agent.model.name.rsplit_once('/') {
        Some((prefix, _)) => format!("{}/{}", prefix, bare_economy),
        None => economy.to_string(),
    };

    let mut candidate = agent.clone();
    candidate.model.name = name.clone();
    let current = providers::estimate_run_cost(agent);
    let cheaper = providers::estimate_run_cost(&candidate);
    (cheaper < current).then_some((name, cheaper))
}

pub fn analyze_performance(config: &AgentConfiguration) -> PerformanceAnalysis {
    let agent = &config.agent;
    let max_run_secs = agent.model.timeout as u64 * agent.max_iterations as u64;

    let timeout_score = if max_run_secs <= MAX_RUN_SECS {
        1.0
    } else {
        (MAX_RUN_SECS as f64 / max_run_secs as f64).clamp(0.0, 1.0)
    };
    let iteration_score = match agent.max_iterations {
        0 => 0.0,
        1..=50 => 1.0,
        n => (50.0 / n as f64).clamp(0.0, 1.0),
    };
    let memory_score = match config.env.memory_mb() {
        None => 0.5,
        Some(mb) if mb < MIN_MEMORY_MB => mb as f64 / MIN_MEMORY_MB as f64,
        Some(mb) if mb < 2048 => 0.7,
        Some(_) => 1.0,
    };
    let cpu_score = match config.env.cpus() {
        None => 0.5,
        Some(c) if c < 1.0 => c.max(0.0),
        Some(c) if c > MAX_USEFUL_CPUS => 0.8,
        Some(_) => 1.0,
    };

    PerformanceAnalysis {
        max_run_secs,
        timeout_score,
        iteration_score,
        memory_score,
        cpu_score,
        overall: (timeout_score + iteration_score + memory_score + cpu_score) / 4.0,
    }
}

pub fn analyze_resources(config: &AgentConfiguration) -> ResourceAnalysis {
    let memory_mb = config.env.memory_mb();
    let cpus = config.env.cpus();
    let deployment = match config.env.deployment() {
        Deployment::Local => "local",
        Deployment::Docker => "docker",
        Deployment::Modal => "modal",
        Deployment::Conflicting => "conflicting",
    };
    ResourceAnalysis {
        deployment,
        memory_mb,
        cpus,
        memory_per_cpu_mb: match (memory_mb, cpus) {
            (Some(mb), Some(c)) if c > 0.0 => Some(mb as f64 / c),
            _ => None,
        },
    }
}

pub fn analyze_efficiency(config: &AgentConfiguration) -> EfficiencyAnalysis {
    let agent = &config.agent;
    let tool_count = agent.tools.len();
    let context_ratio = if agent.model.max_tokens == 0 {
        0.0
    } else {
        agent.history_processor.window_size as f64 / agent.model.max_tokens as f64
    };
    let parser_consistent =
        (agent.parser.name == TOOL_CALLING_PARSER) == agent.parser.function_calling;

    let tool_score = match tool_count {
        0 => 0.0,
        1..=12 => 1.0,
        n => 12.0 / n as f64,
    };
    let context_score = if context_ratio <= 0.5 {
        1.0
    } else {
        (1.0 - (context_ratio - 0.5) * 2.0).clamp(0.0, 1.0)
    };
    let parser_score = if parser_consistent { 1.0 } else { 0.0 };

    EfficiencyAnalysis {
        tool_count,
        context_ratio,
        parser_consistent,
        supports_prompt_cache: providers::profile(agent.model.provider).supports_prompt_cache,
        tool_score,
        context_score,
        overall: (tool_score + context_score + parser_score) / 3.0,
    }
}

pub fn detect_bottlenecks(config: &AgentConfiguration) -> BottleneckAnalysis {
    let agent = &config.agent;
    let mut bottlenecks = Vec::new();
    let mut details = Vec::new();

    let window = agent.history_processor.window_size as f64;
    if window > WINDOW_OVERFLOW_RATIO * agent.model.max_tokens as f64 {
        bottlenecks.push(Bottleneck::ContextOverflow);
        details.push(format!(
            "history window {} leaves little room in {} max_tokens",
            agent.history_processor.window_size, agent.model.max_tokens
        ));
    }
    if let Some(mb) = config.env.memory_mb() {
        if mb < MIN_MEMORY_MB {
            bottlenecks.push(Bottleneck::LowMemory);
            details.push(format!("{} MB sandbox memory", mb));
        }
    }
    let run_secs = agent.model.timeout as u64 * agent.max_iterations as u64;
    if run_secs > MAX_RUN_SECS {
        bottlenecks.push(Bottleneck::TimeoutRisk);
        details.push(format!("worst-case run of {}s", run_secs));
    }

    BottleneckAnalysis {
        bottlenecks,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::test_support::valid_config;

    #[test]
    fn test_analysis_is_deterministic() {
        let config = valid_config();
        assert_eq!(analyze(&config), analyze(&config));
    }

    #[test]
    fn test_cost_offers_economy_model() {
        let cost = analyze_cost(&valid_config());
        assert_eq!(cost.cheaper_model.as_deref(), Some("gpt-4o-mini"));
        assert!(cost.cheaper_estimated_total.unwrap() < cost.estimated_total);
        assert!(!cost.over_budget());
    }

    #[test]
    fn test_no_economy_model_when_already_cheapest() {
        let mut config = valid_config();
        config.agent.model.name = "gpt-4o-mini".to_string();
        assert!(analyze_cost(&config).cheaper_model.is_none());
    }

    #[test]
    fn test_prefixed_economy_model_keeps_prefix() {
        let mut config = valid_config();
        config.agent.model.name = "openai/gpt-4o".to_string();
        assert_eq!(
            analyze_cost(&config).cheaper_model.as_deref(),
            Some("openai/gpt-4o-mini")
        );
    }

    #[test]
    fn test_bottlenecks_match_validator_thresholds() {
        let mut config = valid_config();
        config.agent.model.max_tokens = 8192;
        config.agent.history_processor.window_size = 7000;
        assert!(detect_bottlenecks(&config).has(Bottleneck::ContextOverflow));
        assert!(analyze_efficiency(&config).context_score < 0.5);
    }

    #[test]
    fn test_resources() {
        let resources = analyze_resources(&valid_config());
        assert_eq!(resources.deployment, "docker");
        assert_eq!(resources.memory_per_cpu_mb, Some(2048.0));
    }
}
