//! Environment section: repository, workspace, deployment and secrets

use crate::validation::{validate_non_empty, validate_positive};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `env` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvSpec {
    pub repo: RepoConfig,

    pub workspace: WorkspaceConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal: Option<ModalConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,

    /// Secret name to placeholder. Values are never resolved secrets.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
}

/// Where the agent's sandbox runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Docker,
    Modal,
    /// Both `docker` and `modal` blocks are present
    Conflicting,
}

impl EnvSpec {
    pub fn deployment(&self) -> Deployment {
        match (&self.docker, &self.modal) {
            (Some(_), Some(_)) => Deployment::Conflicting,
            (Some(_), None) => Deployment::Docker,
            (None, Some(_)) => Deployment::Modal,
            (None, None) => Deployment::Local,
        }
    }

    /// Memory available to the sandbox in MB, when a deployment block defines it
    pub fn memory_mb(&self) -> Option<u64> {
        match (&self.docker, &self.modal) {
            (Some(docker), _) => docker.memory_mb(),
            (None, Some(modal)) => Some(modal.memory),
            (None, None) => None,
        }
    }

    pub fn cpus(&self) -> Option<f64> {
        match (&self.docker, &self.modal) {
            (Some(docker), _) => Some(docker.cpus),
            (None, Some(modal)) => Some(modal.cpu),
            (None, None) => None,
        }
    }
}

impl crate::validation::Validate for EnvSpec {
    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ConfigError;

        validate_non_empty("env.repo.github_url", &self.repo.github_url)?;
        validate_non_empty("env.workspace.path", &self.workspace.path)?;
        validate_positive("env.workspace.timeout", self.workspace.timeout as u64, 0)?;

        if self.deployment() == Deployment::Conflicting {
            return Err(ConfigError::validation(
                "env",
                "docker and modal deployments are mutually exclusive",
            ));
        }

        Ok(())
    }
}

/// `env.repo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// `https://<host>/<owner>/<repo>.git`
    pub github_url: String,

    pub owner: String,

    pub name: String,

    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RepoConfig {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// `env.workspace`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub path: String,

    /// Seconds (advisory)
    pub timeout: u32,

    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
}

fn default_cleanup() -> bool {
    true
}

/// `env.docker`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerConfig {
    pub image: String,

    /// Docker-style size, e.g. `4g` or `512m`
    pub memory: String,

    pub cpus: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
}

impl DockerConfig {
    pub fn memory_mb(&self) -> Option<u64> {
        parse_memory_mb(&self.memory)
    }

    pub fn uses_host_network(&self) -> bool {
        self.network_mode.as_deref() == Some("host")
    }
}

/// `env.modal`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalConfig {
    pub image: String,

    pub cpu: f64,

    /// MB
    pub memory: u64,

    /// Seconds
    pub timeout: u32,
}

/// Parse a memory size into megabytes.
///
/// Accepts `4g`, `4gb`, `512m`, `512mb`, `1024k`, or a bare number (megabytes).
pub fn parse_memory_mb(value: &str) -> Option<u64> {
    let lowered = value.trim().to_lowercase();
    let trimmed = lowered.strip_suffix('b').unwrap_or(&lowered);
    let (number, factor) = match trimmed.chars().last()? {
        'g' => (&trimmed[..trimmed.len() - 1], 1024.0),
        'm' => (&trimmed[..trimmed.len() - 1], 1.0),
        'k' => (&trimmed[..trimmed.len() - 1], 1.0 / 1024.0),
        c if c.is_ascii_digit() => (trimmed, 1.0),
        _ => return None,
    };
    let parsed: f64 = number.trim().parse().ok()?;
    if parsed < 0.0 {
        return None;
    }
    Some((parsed * factor).round() as u64)
}

/// Render megabytes back into docker notation
pub fn format_memory(mb: u64) -> String {
    if mb % 1024 == 0 {
        format!("{}g", mb / 1024)
    } else {
        format!("{}m", mb)
    }
}
