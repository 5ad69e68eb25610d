//! Context integration collaborator
//!
//! Supplies what raw environment variables cannot: repository metadata, runner
//! constraints and the security posture of the triggering event.

use agentcfg_core::PlatformContext;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepositoryMetadata {
    pub language: Option<String>,
    pub default_branch: Option<String>,
    pub private: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowConstraints {
    pub runner_os: Option<String>,
    /// Job time limit; the workspace timeout is capped to it
    pub timeout_secs: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityPosture {
    /// The event comes from a fork; sandbox networking is disabled
    pub untrusted_fork: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegratedContext {
    pub repository: RepositoryMetadata,
    pub workflow: WorkflowConstraints,
    pub security: SecurityPosture,
}

#[async_trait]
pub trait ContextIntegration: Send + Sync {
    async fn integrate(
        &self,
        platform: &PlatformContext,
        payload: Option<&Value>,
    ) -> anyhow::Result<IntegratedContext>;
}

/// Reads the webhook payload and runner variables; performs no I/O
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContextIntegration;

/// Runner variable carrying the job timeout in minutes
pub const JOB_TIMEOUT_VAR: &str = "AGENTCFG_JOB_TIMEOUT_MINUTES";

#[async_trait]
impl ContextIntegration for DefaultContextIntegration {
    async fn integrate(
        &self,
        platform: &PlatformContext,
        payload: Option<&Value>,
    ) -> anyhow::Result<IntegratedContext> {
        let env = &platform.env;
        let timeout_secs = match env.get(JOB_TIMEOUT_VAR) {
            Some(raw) => {
                let minutes: u32 = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("{} must be a number of minutes, got '{}'", JOB_TIMEOUT_VAR, raw)
                })?;
                Some(minutes.saturating_mul(60))
            }
            None => None,
        };

        let repo = payload.and_then(|p| p.get("repository"));
        let repository = RepositoryMetadata {
            language: repo
                .and_then(|r| r.get("language"))
                .and_then(Value::as_str)
                .map(|l| l.to_lowercase()),
            default_branch: repo
                .and_then(|r| r.get("default_branch"))
                .and_then(Value::as_str)
                .map(str::to_string),
            private: repo
                .and_then(|r| r.get("private"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };

        let untrusted_fork = payload
            .and_then(|p| p.pointer("/pull_request/head/repo/fork"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(IntegratedContext {
            repository,
            workflow: WorkflowConstraints {
                runner_os: env.get("RUNNER_OS").map(str::to_string),
                timeout_secs,
            },
            security: SecurityPosture { untrusted_fork },
        })
    }
}
