//! Stage 3: repository, secrets and deployment bounds

use super::{IssueCategory, StageReport};
use crate::providers;
use agentcfg_config::{AgentConfiguration, ValidationMode};
use once_cell::sync::Lazy;
use regex::Regex;

static REPO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://[A-Za-z0-9.-]+(:\d+)?/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+\.git$")
        .expect("valid regex")
});

const MIN_DOCKER_MEMORY_MB: u64 = 512;
const MIN_MODAL_CPU: f64 = 1.0;
const MAX_MODAL_TIMEOUT_SECS: u32 = 7200;
const MODAL_SECRETS: [&str; 2] = ["MODAL_TOKEN_ID", "MODAL_TOKEN_SECRET"];

/// `https://<host>/<owner>/<repo>.git`
pub fn is_valid_repo_url(url: &str) -> bool {
    REPO_URL.is_match(url)
}

/// Placeholder values that mean "not provided"
pub fn is_absent(value: Option<&String>) -> bool {
    match value.map(|v| v.trim()) {
        None => true,
        Some(v) => v.is_empty() || v == "missing" || v == "undefined",
    }
}

pub fn check(config: &AgentConfiguration, mode: ValidationMode, report: &mut StageReport) {
    let env = &config.env;

    if !is_valid_repo_url(&env.repo.github_url) {
        report.error(
            IssueCategory::Environment,
            "env.repo.github_url",
            format!(
                "'{}' is not of the form https://<host>/<owner>/<repo>.git",
                env.repo.github_url
            ),
        );
    }

    let profile = providers::profile(config.agent.model.provider);
    for name in profile.secrets {
        if is_absent(env.secrets.get(*name)) {
            report.strict(
                mode,
                IssueCategory::Environment,
                format!("env.secrets.{}", name),
                format!(
                    "secret {} required by provider {} is not provided",
                    name, profile.provider
                ),
            );
        }
    }

    if let Some(docker) = &env.docker {
        if let Some(mb) = docker.memory_mb() {
            if mb < MIN_DOCKER_MEMORY_MB {
                report.error(
                    IssueCategory::Environment,
                    "env.docker.memory",
                    format!("container memory {} is below 512m", docker.memory),
                );
            }
        }
    }

    if let Some(modal) = &env.modal {
        if modal.cpu < MIN_MODAL_CPU {
            report.error(
                IssueCategory::Environment,
                "env.modal.cpu",
                format!("sandbox cpu {} is below 1", modal.cpu),
            );
        }
        if modal.timeout > MAX_MODAL_TIMEOUT_SECS {
            report.error(
                IssueCategory::Environment,
                "env.modal.timeout",
                format!("sandbox timeout {}s exceeds 2 hours", modal.timeout),
            );
        }
        for name in MODAL_SECRETS {
            if is_absent(env.secrets.get(name)) {
                report.strict(
                    mode,
                    IssueCategory::Environment,
                    format!("env.secrets.{}", name),
                    format!("secret {} required by modal deployment is not provided", name),
                );
            }
        }
    }
}
