//! Stage 5: resource sizing and context budget

use super::{Bottleneck, IssueCategory, StageReport};
use agentcfg_config::AgentConfiguration;

pub const MIN_MEMORY_MB: u64 = 1024;
pub const MAX_MEMORY_MB: u64 = 16 * 1024;
pub const MAX_USEFUL_CPUS: f64 = 8.0;
/// Longest a run may plausibly take before it is flagged, in seconds
pub const MAX_RUN_SECS: u64 = 3600;
pub const WINDOW_WARN_RATIO: f64 = 0.5;
pub const WINDOW_OVERFLOW_RATIO: f64 = 0.8;

pub fn check(config: &AgentConfiguration, report: &mut StageReport) {
    let agent = &config.agent;

    if let Some(mb) = config.env.memory_mb() {
        if mb < MIN_MEMORY_MB {
            report.warn(
                IssueCategory::Performance,
                "env.memory",
                format!("{} MB of memory is likely too little for builds and tests", mb),
            );
            report.flag(Bottleneck::LowMemory);
        } else if mb > MAX_MEMORY_MB {
            report.warn(
                IssueCategory::Performance,
                "env.memory",
                format!("{} MB of memory is more than an agent run needs", mb),
            );
        }
    }

    if let Some(cpus) = config.env.cpus() {
        if cpus > MAX_USEFUL_CPUS {
            report.warn(
                IssueCategory::Performance,
                "env.cpus",
                format!("{} cpus rarely help an LLM-bound workload", cpus),
            );
        }
    }

    let run_secs = agent.model.timeout as u64 * agent.max_iterations as u64;
    if run_secs > MAX_RUN_SECS {
        report.warn(
            IssueCategory::Performance,
            "agent.max_iterations",
            format!(
                "timeout {}s x {} iterations allows a {}s run",
                agent.model.timeout, agent.max_iterations, run_secs
            ),
        );
        report.flag(Bottleneck::TimeoutRisk);
    }

    let window = agent.history_processor.window_size as f64;
    let max_tokens = agent.model.max_tokens as f64;
    if window > WINDOW_OVERFLOW_RATIO * max_tokens {
        report.warn(
            IssueCategory::Performance,
            "agent.history_processor.window_size",
            format!(
                "history window {} exceeds 80% of max_tokens {}",
                agent.history_processor.window_size, agent.model.max_tokens
            ),
        );
        report.flag(Bottleneck::ContextOverflow);
    } else if window > WINDOW_WARN_RATIO * max_tokens {
        report.warn(
            IssueCategory::Performance,
            "agent.history_processor.window_size",
            format!(
                "history window {} exceeds half of max_tokens {}",
                agent.history_processor.window_size, agent.model.max_tokens
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::test_support::valid_config;

    fn run(config: &AgentConfiguration) -> StageReport {
        let mut report = StageReport::default();
        check(config, &mut report);
        report
    }

    #[test]
    fn test_context_overflow_bottleneck() {
        let mut config = valid_config();
        config.agent.model.max_tokens = 8192;
        config.agent.history_processor.window_size = 7000;
        let report = run(&config);
        assert!(report.bottlenecks.contains(&Bottleneck::ContextOverflow));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_half_window_warns_without_bottleneck() {
        let mut config = valid_config();
        config.agent.model.max_tokens = 8192;
        config.agent.history_processor.window_size = 5000;
        let report = run(&config);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.bottlenecks.is_empty());
    }

    #[test]
    fn test_resource_bounds() {
        let mut config = valid_config();
        if let Some(docker) = config.env.docker.as_mut() {
            docker.memory = "512m".to_string();
            docker.cpus = 16.0;
        }
        config.agent.model.timeout = 600;
        config.agent.max_iterations = 100;
        let report = run(&config);
        assert_eq!(report.warnings.len(), 3);
        assert_eq!(
            report.bottlenecks,
            vec![Bottleneck::LowMemory, Bottleneck::TimeoutRisk]
        );
    }
}
