//! Stage 1: field presence and numeric ranges

use super::{IssueCategory, StageReport};
use agentcfg_config::validation::{validate_non_empty, validate_range};
use agentcfg_config::AgentConfiguration;
use std::collections::HashSet;

const MAX_TOKENS_RANGE: (u32, u32) = (1, 200_000);
const MODEL_TIMEOUT_RANGE: (u32, u32) = (1, 3600);
const ITERATION_RANGE: (u32, u32) = (1, 500);
const MAX_COST_LIMIT: f64 = 100.0;

pub fn check(config: &AgentConfiguration, report: &mut StageReport) {
    let agent = &config.agent;
    let model = &agent.model;

    for (path, value) in [
        ("problem_statement.id", config.problem_statement.id.as_str()),
        ("problem_statement.text", config.problem_statement.text.as_str()),
        ("agent.model.name", model.name.as_str()),
        ("agent.parser.name", agent.parser.name.as_str()),
        ("agent.history_processor.name", agent.history_processor.name.as_str()),
        ("env.repo.github_url", config.env.repo.github_url.as_str()),
        ("env.workspace.path", config.env.workspace.path.as_str()),
    ] {
        if let Err(err) = validate_non_empty(path, value) {
            report.config_error(path, err);
        }
    }

    if let Err(err) = validate_range("agent.model.temperature", model.temperature, 0.0, 2.0) {
        report.config_error("agent.model.temperature", err);
    }
    if let Err(err) = validate_range("agent.model.top_p", model.top_p, 0.0, 1.0) {
        report.config_error("agent.model.top_p", err);
    }
    within(report, "agent.model.max_tokens", model.max_tokens, MAX_TOKENS_RANGE);
    within(report, "agent.model.timeout", model.timeout, MODEL_TIMEOUT_RANGE);
    within(report, "agent.max_iterations", agent.max_iterations, ITERATION_RANGE);

    if agent.history_processor.window_size == 0 {
        report.error(
            IssueCategory::Schema,
            "agent.history_processor.window_size",
            "window_size must be > 0",
        );
    }

    if let Some(limit) = agent.cost_limit {
        if let Err(err) = validate_range("agent.cost_limit", limit, 0.0, MAX_COST_LIMIT) {
            report.config_error("agent.cost_limit", err);
        }
    }

    if agent.tools.is_empty() {
        report.error(IssueCategory::Schema, "agent.tools", "At least one tool is required");
    }
    let mut seen = HashSet::new();
    for (index, tool) in agent.tools.iter().enumerate() {
        let path = format!("agent.tools[{}].name", index);
        if tool.name.trim().is_empty() {
            report.error(IssueCategory::Schema, path, "tool name must not be empty");
        } else if !seen.insert(tool.name.as_str()) {
            report.warn(
                IssueCategory::Schema,
                path,
                format!("duplicate tool '{}'", tool.name),
            );
        }
    }

    if config.env.workspace.timeout == 0 {
        report.error(
            IssueCategory::Schema,
            "env.workspace.timeout",
            "workspace timeout must be > 0",
        );
    }

    if let Some(docker) = &config.env.docker {
        if docker.image.trim().is_empty() {
            report.error(IssueCategory::Schema, "env.docker.image", "image must not be empty");
        }
        if docker.memory_mb().is_none() {
            report.error(
                IssueCategory::Schema,
                "env.docker.memory",
                format!("unparseable memory size '{}'", docker.memory),
            );
        }
        if docker.cpus <= 0.0 {
            report.error(IssueCategory::Schema, "env.docker.cpus", "cpus must be > 0");
        }
    }

    if let Some(modal) = &config.env.modal {
        if modal.image.trim().is_empty() {
            report.error(IssueCategory::Schema, "env.modal.image", "image must not be empty");
        }
        if modal.cpu <= 0.0 {
            report.error(IssueCategory::Schema, "env.modal.cpu", "cpu must be > 0");
        }
        if modal.memory == 0 {
            report.error(IssueCategory::Schema, "env.modal.memory", "memory must be > 0");
        }
    }
}

fn within(report: &mut StageReport, path: &str, value: u32, (min, max): (u32, u32)) {
    if value < min || value > max {
        report.error(
            IssueCategory::Schema,
            path,
            format!("{} must be between {} and {}, got {}", path, min, max, value),
        );
    }
}
