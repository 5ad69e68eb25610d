//! Stage 2: consistency between fields that are valid on their own

use super::{IssueCategory, StageReport};
use crate::providers;
use agentcfg_config::{AgentConfiguration, Deployment, TOOL_CALLING_PARSER};

pub fn check(config: &AgentConfiguration, report: &mut StageReport) {
    let agent = &config.agent;
    let model = &agent.model;
    let parser = &agent.parser;

    if parser.name == TOOL_CALLING_PARSER && !parser.function_calling {
        report.error(
            IssueCategory::CrossComponent,
            "agent.parser.function_calling",
            "ToolCallingParser requires function_calling=true",
        );
    }

    if model.provider.is_local() && parser.function_calling {
        report.warn(
            IssueCategory::CrossComponent,
            "agent.parser.function_calling",
            format!(
                "local model '{}' may not support function calling",
                model.name
            ),
        );
    }

    if let Some(ceiling) = providers::model_ceiling(&model.name) {
        if model.max_tokens > ceiling {
            report.error(
                IssueCategory::CrossComponent,
                "agent.model.max_tokens",
                format!(
                    "max_tokens {} exceeds the {} limit of {}",
                    model.max_tokens, model.name, ceiling
                ),
            );
        }
    }

    let missing: Vec<&str> = parser
        .required_tools()
        .iter()
        .copied()
        .filter(|name| !agent.has_tool(name))
        .collect();
    if !missing.is_empty() {
        report.warn(
            IssueCategory::CrossComponent,
            "agent.tools",
            format!("{} expects tools: {}", parser.name, missing.join(", ")),
        );
    }

    if config.env.deployment() == Deployment::Conflicting {
        report.error(
            IssueCategory::CrossComponent,
            "env",
            "docker and modal deployments are mutually exclusive",
        );
    }

    if let Some(limit) = agent.cost_limit {
        let estimate = providers::estimate_run_cost(agent);
        if estimate > limit {
            report.warn(
                IssueCategory::CrossComponent,
                "agent.cost_limit",
                format!(
                    "estimated cost ${:.2} at {} iterations exceeds cost_limit ${:.2}",
                    estimate, agent.max_iterations, limit
                ),
            );
        }
    }

    if let Some(implied) = providers::match_model(&model.name) {
        if implied != model.provider {
            report.warn(
                IssueCategory::CrossComponent,
                "agent.model.provider",
                format!(
                    "model '{}' looks like a {} model but provider is {}",
                    model.name, implied, model.provider
                ),
            );
        }
    }
}
