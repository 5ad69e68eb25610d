//! Priority-ordered optimization strategies
//!
//! Each strategy is a pure function from the document and its analysis to an optional
//! proposal. Proposals are gated by the optimization mode before they become
//! recommendations.

use super::analysis::ConfigAnalysis;
use super::patch::ConfigPatch;
use crate::providers;
use crate::validator::Bottleneck;
use agentcfg_config::{AgentConfiguration, OptimizationMode};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    Cost,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ModelSelection,
    TokenBudget,
    IterationCap,
    Batching,
    Caching,
    Parallelism,
    MemorySizing,
    CpuMemoryBalance,
    RequestRetry,
    Streaming,
}

/// Application order; cost strategies first, later entries win on collisions
pub const REGISTRY: [StrategyKind; 10] = [
    StrategyKind::ModelSelection,
    StrategyKind::TokenBudget,
    StrategyKind::IterationCap,
    StrategyKind::Batching,
    StrategyKind::Caching,
    StrategyKind::Parallelism,
    StrategyKind::MemorySizing,
    StrategyKind::CpuMemoryBalance,
    StrategyKind::RequestRetry,
    StrategyKind::Streaming,
];

/// Output of a strategy before mode gating
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub patch: ConfigPatch,
    /// Expected benefit in `0.0..=1.0`
    pub potential: f64,
    /// USD per run for cost strategies, fraction of run time for performance ones
    pub estimated_saving: f64,
    /// The strategy addresses a detected risk (over budget, bottleneck)
    pub risk_signal: bool,
    pub rationale: String,
}

impl StrategyKind {
    pub fn category(&self) -> StrategyCategory {
        match self {
            StrategyKind::ModelSelection
            | StrategyKind::TokenBudget
            | StrategyKind::IterationCap
            | StrategyKind::Batching
            | StrategyKind::Caching => StrategyCategory::Cost,
            _ => StrategyCategory::Performance,
        }
    }

    /// Position in `REGISTRY`, starting at 1
    pub fn priority(&self) -> usize {
        REGISTRY.iter().position(|k| k == self).map_or(0, |p| p + 1)
    }

    /// Model changes need confirmation; everything else applies automatically
    pub fn auto_apply(&self) -> bool {
        *self != StrategyKind::ModelSelection
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::ModelSelection => "model_selection",
            StrategyKind::TokenBudget => "token_budget",
            StrategyKind::IterationCap => "iteration_cap",
            StrategyKind::Batching => "batching",
            StrategyKind::Caching => "caching",
            StrategyKind::Parallelism => "parallelism",
            StrategyKind::MemorySizing => "memory_sizing",
            StrategyKind::CpuMemoryBalance => "cpu_memory_balance",
            StrategyKind::RequestRetry => "request_retry",
            StrategyKind::Streaming => "streaming",
        }
    }

    pub fn propose(&self, config: &AgentConfiguration, analysis: &ConfigAnalysis) -> Option<Proposal> {
        match self {
            StrategyKind::ModelSelection => model_selection(config, analysis),
            StrategyKind::TokenBudget => token_budget(config, analysis),
            StrategyKind::IterationCap => iteration_cap(config, analysis),
            StrategyKind::Batching => batching(config),
            StrategyKind::Caching => caching(config),
            StrategyKind::Parallelism => parallelism(config),
            StrategyKind::MemorySizing => memory_sizing(analysis),
            StrategyKind::CpuMemoryBalance => cpu_memory_balance(analysis),
            StrategyKind::RequestRetry => request_retry(config, analysis),
            StrategyKind::Streaming => streaming(config),
        }
    }

    /// Mode gate over a proposal
    pub fn applicable(&self, mode: OptimizationMode, proposal: &Proposal) -> bool {
        match mode {
            OptimizationMode::Aggressive => true,
            OptimizationMode::Conservative => proposal.potential > 0.5,
            OptimizationMode::Balanced => proposal.potential > 0.3,
            OptimizationMode::CostFocused => {
                self.category() == StrategyCategory::Cost || proposal.risk_signal
            }
            OptimizationMode::PerformanceFocused => {
                self.category() == StrategyCategory::Performance || proposal.risk_signal
            }
        }
    }
}

fn model_selection(config: &AgentConfiguration, analysis: &ConfigAnalysis) -> Option<Proposal> {
    let cost = &analysis.cost;
    let cheaper = cost.cheaper_model.clone()?;
    let cheaper_total = cost.cheaper_estimated_total?;
    if cost.estimated_total <= 0.0 {
        return None;
    }
    let saving = cost.estimated_total - cheaper_total;
    // Keep the output budget inside the cheaper model's ceiling
    let max_tokens = providers::model_ceiling(&cheaper)
        .filter(|ceiling| config.agent.model.max_tokens > *ceiling);
    Some(Proposal {
        patch: ConfigPatch {
            model_name: Some(cheaper.clone()),
            max_tokens,
            ..Default::default()
        },
        potential: (saving / cost.estimated_total).clamp(0.0, 1.0),
        estimated_saving: saving,
        risk_signal: cost.over_budget(),
        rationale: format!(
            "{} costs about ${:.2} per run; {} about ${:.2}",
            config.agent.model.name, cost.estimated_total, cheaper, cheaper_total
        ),
    })
}

fn token_budget(config: &AgentConfiguration, analysis: &ConfigAnalysis) -> Option<Proposal> {
    let max_tokens = config.agent.model.max_tokens;
    let window = config.agent.history_processor.window_size;
    let target = (max_tokens as f64 * 0.4) as u32;
    if window as f64 <= max_tokens as f64 * 0.5 || target == 0 {
        return None;
    }
    let trimmed = (window - target) as f64;
    let saving = trimmed * 0.75 / 1000.0
        * analysis.cost.input_per_1k
        * config.agent.max_iterations as f64;
    Some(Proposal {
        patch: ConfigPatch {
            window_size: Some(target),
            ..Default::default()
        },
        potential: (trimmed / window as f64).clamp(0.0, 1.0),
        estimated_saving: saving,
        risk_signal: analysis.bottlenecks.has(Bottleneck::ContextOverflow),
        rationale: format!(
            "history window {} is {:.0}% of max_tokens; trim to {}",
            window,
            window as f64 / max_tokens.max(1) as f64 * 100.0,
            target
        ),
    })
}

/// Iterations never drop below this
const MIN_ITERATIONS: u32 = 10;
const MAX_SENSIBLE_ITERATIONS: u32 = 100;

fn iteration_cap(config: &AgentConfiguration, analysis: &ConfigAnalysis) -> Option<Proposal> {
    let iterations = config.agent.max_iterations;
    let cost = &analysis.cost;

    let budget_cap = match cost.cost_limit {
        Some(limit) if cost.over_budget() && cost.cost_per_iteration > 0.0 => {
            Some(((limit / cost.cost_per_iteration).floor() as u32).max(MIN_ITERATIONS))
        }
        _ => None,
    };
    let cap = budget_cap
        .or_else(|| (iterations > MAX_SENSIBLE_ITERATIONS).then_some(MAX_SENSIBLE_ITERATIONS))?;
    if cap >= iterations {
        return None;
    }

    Some(Proposal {
        patch: ConfigPatch {
            max_iterations: Some(cap),
            ..Default::default()
        },
        potential: (1.0 - cap as f64 / iterations as f64).clamp(0.0, 1.0),
        estimated_saving: cost.cost_per_iteration * (iterations - cap) as f64,
        risk_signal: cost.over_budget(),
        rationale: format!("cap iterations at {} (was {})", cap, iterations),
    })
}

fn batching(config: &AgentConfiguration) -> Option<Proposal> {
    let agent = &config.agent;
    if !agent.parser.function_calling || agent.runtime.batch_tool_calls {
        return None;
    }
    let potential = if agent.tools.len() > 4 { 0.35 } else { 0.2 };
    Some(Proposal {
        patch: ConfigPatch {
            batch_tool_calls: Some(true),
            ..Default::default()
        },
        potential,
        estimated_saving: providers::estimate_run_cost(agent) * 0.05,
        risk_signal: false,
        rationale: "batch independent tool calls into one request".to_string(),
    })
}

fn caching(config: &AgentConfiguration) -> Option<Proposal> {
    let agent = &config.agent;
    let profile = providers::profile(agent.model.provider);
    let wants_cache_processor = profile.history_processor == "CacheControlHistoryProcessor"
        && agent.history_processor.name != profile.history_processor;
    if agent.runtime.response_cache && !wants_cache_processor {
        return None;
    }
    let potential = if profile.supports_prompt_cache { 0.4 } else { 0.2 };
    Some(Proposal {
        patch: ConfigPatch {
            response_cache: Some(true),
            history_processor: wants_cache_processor
                .then(|| profile.history_processor.to_string()),
            ..Default::default()
        },
        potential,
        estimated_saving: providers::estimate_run_cost(agent) * potential * 0.25,
        risk_signal: false,
        rationale: format!("enable response caching for {}", agent.model.provider),
    })
}

fn parallelism(config: &AgentConfiguration) -> Option<Proposal> {
    let agent = &config.agent;
    let cpus = config.env.cpus().unwrap_or(1.0);
    if !agent.parser.function_calling || agent.runtime.parallel_tool_calls || cpus < 2.0 {
        return None;
    }
    Some(Proposal {
        patch: ConfigPatch {
            parallel_tool_calls: Some(true),
            ..Default::default()
        },
        potential: 0.4,
        estimated_saving: 0.15,
        risk_signal: false,
        rationale: format!("{} cpus allow parallel tool execution", cpus),
    })
}

const TARGET_MEMORY_MB: u64 = 4096;
const MAX_SENSIBLE_MEMORY_MB: u64 = 8192;
const OVERSIZED_MEMORY_MB: u64 = 16 * 1024;

fn memory_sizing(analysis: &ConfigAnalysis) -> Option<Proposal> {
    let mb = analysis.resources.memory_mb?;
    let (target, potential, risk) = if mb < 2048 {
        (TARGET_MEMORY_MB, 0.6, analysis.bottlenecks.has(Bottleneck::LowMemory))
    } else if mb > OVERSIZED_MEMORY_MB {
        (MAX_SENSIBLE_MEMORY_MB, 0.4, false)
    } else {
        return None;
    };
    Some(Proposal {
        patch: ConfigPatch {
            memory_mb: Some(target),
            ..Default::default()
        },
        potential,
        estimated_saving: if mb < target { 0.2 } else { 0.0 },
        risk_signal: risk,
        rationale: format!("resize sandbox memory from {} MB to {} MB", mb, target),
    })
}

fn cpu_memory_balance(analysis: &ConfigAnalysis) -> Option<Proposal> {
    let resources = &analysis.resources;
    let (mb, cpus) = (resources.memory_mb?, resources.cpus?);
    let per_cpu = resources.memory_per_cpu_mb?;

    let target = if cpus > 8.0 {
        8.0
    } else if per_cpu < 1024.0 {
        ((mb / 1024) as f64).max(1.0)
    } else if per_cpu > 8192.0 {
        ((mb / 4096) as f64).clamp(1.0, 8.0)
    } else {
        return None;
    };
    if (target - cpus).abs() < f64::EPSILON {
        return None;
    }
    Some(Proposal {
        patch: ConfigPatch {
            cpus: Some(target),
            ..Default::default()
        },
        potential: 0.35,
        estimated_saving: 0.1,
        risk_signal: false,
        rationale: format!(
            "{:.0} MB per cpu is unbalanced; use {} cpus",
            per_cpu, target
        ),
    })
}

const RETRY_ATTEMPTS: u32 = 3;
/// Shortest per-request timeout a trim may produce
const MIN_REQUEST_TIMEOUT: u32 = 60;

fn request_retry(config: &AgentConfiguration, analysis: &ConfigAnalysis) -> Option<Proposal> {
    let agent = &config.agent;
    let timeout_risk = analysis.bottlenecks.has(Bottleneck::TimeoutRisk);
    if agent.runtime.retry_attempts > 0 && !timeout_risk {
        return None;
    }

    let model_timeout = if timeout_risk && agent.max_iterations > 0 {
        let fitted = (3600 / agent.max_iterations).max(MIN_REQUEST_TIMEOUT);
        (fitted < agent.model.timeout).then_some(fitted)
    } else {
        None
    };
    Some(Proposal {
        patch: ConfigPatch {
            retry_attempts: (agent.runtime.retry_attempts == 0).then_some(RETRY_ATTEMPTS),
            model_timeout,
            ..Default::default()
        },
        potential: if timeout_risk { 0.6 } else { 0.25 },
        estimated_saving: if timeout_risk { 0.3 } else { 0.05 },
        risk_signal: timeout_risk,
        rationale: if timeout_risk {
            format!(
                "worst-case run of {}s; retry transient failures and shorten requests",
                analysis.performance.max_run_secs
            )
        } else {
            "retry transient provider failures".to_string()
        },
    })
}

fn streaming(config: &AgentConfiguration) -> Option<Proposal> {
    let agent = &config.agent;
    if agent.runtime.streaming {
        return None;
    }
    Some(Proposal {
        patch: ConfigPatch {
            streaming: Some(true),
            ..Default::default()
        },
        potential: if agent.model.max_tokens >= 8192 { 0.35 } else { 0.2 },
        estimated_saving: 0.05,
        risk_signal: false,
        rationale: "stream long completions".to_string(),
    })
}
