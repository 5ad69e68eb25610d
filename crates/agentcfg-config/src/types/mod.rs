//! Configuration type definitions
//!
//! `AgentConfiguration` is the compiled document handed to the external agent. The
//! field names and nesting (`problem_statement`, `agent.model/parser/history_processor/tools`,
//! `env.repo/workspace/docker|modal/secrets`) are consumed by other tooling and must not change.

pub mod agent;
pub mod environment;
pub mod problem;
pub mod provider;
pub mod settings;

pub use agent::{
    AgentSpec, HistoryProcessorConfig, ModelConfig, ParserConfig, RuntimeOptions, ToolConfig,
    SHELL_TOOL, THOUGHT_ACTION_PARSER, TOOL_CALLING_PARSER,
};
pub use environment::{
    format_memory, parse_memory_mb, Deployment, DockerConfig, EnvSpec, ModalConfig, RepoConfig,
    WorkspaceConfig,
};
pub use problem::{ProblemStatement, ProblemType};
pub use provider::Provider;
pub use settings::{
    CacheSettings, LoggingSettings, OptimizationMode, OptimizationSettings, PerformanceProfile,
    ProfileCeilings, Settings, ValidationMode, ValidationSettings,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The compiled three-section agent configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfiguration {
    pub problem_statement: ProblemStatement,

    pub agent: AgentSpec,

    pub env: EnvSpec,

    #[serde(default, skip_serializing_if = "ConfigMetadata::is_empty")]
    pub metadata: ConfigMetadata,
}

impl crate::validation::Validate for AgentConfiguration {
    fn validate(&self) -> crate::error::Result<()> {
        self.agent.validate()?;
        self.env.validate()?;
        Ok(())
    }
}

/// Provenance annotations carried alongside the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Set when a fallback document replaced the generated one
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_errors: Vec<String>,

    /// Set only on the orchestrator's emergency document
    #[serde(default, skip_serializing_if = "is_false")]
    pub error_fallback: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ConfigMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
