//! Secondary outputs: CLI arguments, environment map, deployment instructions

use crate::error::Result;
use agentcfg_config::{AgentConfiguration, Deployment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "agent_config.yaml";
pub const ENV_FILE: &str = "agent.env";
pub const INSTRUCTIONS_FILE: &str = "DEPLOYMENT.md";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Artifacts {
    pub cli_args: Vec<String>,
    /// Secret values are CI placeholders, never resolved
    pub env_vars: BTreeMap<String, String>,
    pub deployment_instructions: String,
}

pub fn derive(config: &AgentConfiguration) -> Artifacts {
    Artifacts {
        cli_args: cli_args(config),
        env_vars: env_vars(config),
        deployment_instructions: deployment_instructions(config),
    }
}

fn deployment_name(config: &AgentConfiguration) -> &'static str {
    match config.env.deployment() {
        Deployment::Docker => "docker",
        Deployment::Modal => "modal",
        Deployment::Local | Deployment::Conflicting => "local",
    }
}

pub fn cli_args(config: &AgentConfiguration) -> Vec<String> {
    let agent = &config.agent;
    let mut args = vec![
        "run".to_string(),
        "--config".to_string(),
        CONFIG_FILE.to_string(),
        format!("--agent.model.name={}", agent.model.name),
        format!("--agent.model.temperature={}", agent.model.temperature),
        format!("--agent.max_iterations={}", agent.max_iterations),
    ];
    if let Some(limit) = agent.cost_limit {
        args.push(format!("--agent.model.per_instance_cost_limit={}", limit));
    }
    args.push(format!("--env.repo.github_url={}", config.env.repo.github_url));
    if let Some(base) = &config.env.repo.base_commit {
        args.push(format!("--env.repo.base_commit={}", base));
    }
    args.push(format!("--env.deployment.type={}", deployment_name(config)));
    let image = config
        .env
        .docker
        .as_ref()
        .map(|d| d.image.as_str())
        .or_else(|| config.env.modal.as_ref().map(|m| m.image.as_str()));
    if let Some(image) = image {
        args.push(format!("--env.deployment.image={}", image));
    }
    args
}

/// `${{ secrets.NAME }}` for every secret, then the document's plain variables
pub fn env_vars(config: &AgentConfiguration) -> BTreeMap<String, String> {
    let mut vars: BTreeMap<String, String> = config
        .env
        .secrets
        .keys()
        .map(|name| (name.clone(), format!("${{{{ secrets.{} }}}}", name)))
        .collect();
    for (name, value) in &config.env.environment_variables {
        vars.entry(name.clone()).or_insert_with(|| value.clone());
    }
    vars.insert("SWE_AGENT_CONFIG".to_string(), CONFIG_FILE.to_string());
    vars
}

pub fn deployment_instructions(config: &AgentConfiguration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Agent deployment");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Repository: {}", config.env.repo.github_url);
    let _ = writeln!(
        out,
        "- Model: {} ({})",
        config.agent.model.name, config.agent.model.provider
    );
    let _ = writeln!(out, "- Problem: {} `{}`", config.problem_statement.kind, config.problem_statement.id);
    if let Some(limit) = config.agent.cost_limit {
        let _ = writeln!(out, "- Cost limit: ${:.2}", limit);
    }
    let _ = writeln!(out, "- Iterations: {}", config.agent.max_iterations);
    if config.metadata.error_fallback {
        let _ = writeln!(out, "- Emergency configuration: the generation pipeline failed");
    } else if config.metadata.fallback {
        let _ = writeln!(out, "- Fallback configuration: the generated document failed validation");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Secrets");
    let _ = writeln!(out);
    if config.env.secrets.is_empty() {
        let _ = writeln!(out, "None required.");
    }
    for (name, value) in &config.env.secrets {
        let state = if value == "missing" { "missing" } else { "configured" };
        let _ = writeln!(out, "- `{}` ({})", name, state);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Run");
    let _ = writeln!(out);
    match config.env.deployment() {
        Deployment::Docker => {
            if let Some(docker) = &config.env.docker {
                let _ = writeln!(
                    out,
                    "Pull `{}` and allow {} of memory and {} cpus.",
                    docker.image, docker.memory, docker.cpus
                );
            }
        }
        Deployment::Modal => {
            if let Some(modal) = &config.env.modal {
                let _ = writeln!(
                    out,
                    "Modal sandbox from `{}` with {} MB and {} cpus, timeout {}s.",
                    modal.image, modal.memory, modal.cpu, modal.timeout
                );
            }
        }
        Deployment::Local | Deployment::Conflicting => {
            let _ = writeln!(out, "Runs directly in `{}`.", config.env.workspace.path);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "```sh");
    let _ = writeln!(out, "sweagent {}", cli_args(config).join(" "));
    let _ = writeln!(out, "```");
    out
}

/// Write the YAML document, env file and instructions into `dir`
pub async fn write_artifacts(
    dir: &Path,
    yaml_text: &str,
    artifacts: &Artifacts,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let env_file: String = artifacts
        .env_vars
        .iter()
        .map(|(k, v)| format!("{}={}\n", k, v))
        .collect();

    let files = [
        (CONFIG_FILE, yaml_text.to_string()),
        (ENV_FILE, env_file),
        (INSTRUCTIONS_FILE, artifacts.deployment_instructions.clone()),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), "Wrote artifact");
        written.push(path);
    }
    Ok(written)
}
