//! Agent section: model, parser, history processor, tools and budgets

use crate::types::Provider;
use crate::validation::{validate_non_empty, validate_positive, validate_range};
use serde::{Deserialize, Serialize};

/// Parser that requires native function calling
pub const TOOL_CALLING_PARSER: &str = "ToolCallingParser";
/// Parser that extracts actions from free-form thought/action text
pub const THOUGHT_ACTION_PARSER: &str = "ThoughtActionParser";

/// Shell tool name; the only tool that takes a restricted-command list
pub const SHELL_TOOL: &str = "bash";

/// `agent` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub model: ModelConfig,

    pub parser: ParserConfig,

    pub history_processor: HistoryProcessorConfig,

    pub tools: Vec<ToolConfig>,

    /// Per-instance spend ceiling in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_limit: Option<f64>,

    pub max_iterations: u32,

    /// Runtime switches set by the optimizer
    #[serde(default, skip_serializing_if = "RuntimeOptions::is_default")]
    pub runtime: RuntimeOptions,
}

impl AgentSpec {
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

impl crate::validation::Validate for AgentSpec {
    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ConfigError;

        validate_non_empty("agent.model.name", &self.model.name)?;
        validate_positive("agent.model.max_tokens", self.model.max_tokens as u64, 0)?;
        validate_positive("agent.max_iterations", self.max_iterations as u64, 0)?;
        validate_range("agent.model.temperature", self.model.temperature, 0.0, 2.0)?;
        validate_range("agent.model.top_p", self.model.top_p, 0.0, 1.0)?;

        if self.tools.is_empty() {
            return Err(ConfigError::validation(
                "agent.tools",
                "At least one tool is required",
            ));
        }

        if let Some(limit) = self.cost_limit {
            if limit < 0.0 || !limit.is_finite() {
                return Err(ConfigError::validation(
                    "agent.cost_limit",
                    format!("cost_limit must be >= 0, got {}", limit),
                ));
            }
        }

        Ok(())
    }
}

/// `agent.model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier, optionally provider-prefixed (`deepseek/deepseek-chat`)
    pub name: String,

    pub provider: Provider,

    #[serde(default)]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    pub max_tokens: u32,

    /// Per-request timeout in seconds (advisory)
    pub timeout: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Name of the environment variable holding the key, never the key itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_top_p() -> f64 {
    1.0
}

/// `agent.parser`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    pub name: String,
    pub function_calling: bool,
}

impl ParserConfig {
    pub fn tool_calling() -> Self {
        Self {
            name: TOOL_CALLING_PARSER.to_string(),
            function_calling: true,
        }
    }

    pub fn thought_action() -> Self {
        Self {
            name: THOUGHT_ACTION_PARSER.to_string(),
            function_calling: false,
        }
    }

    /// Tools the parser cannot operate without
    pub fn required_tools(&self) -> &'static [&'static str] {
        if self.name == TOOL_CALLING_PARSER {
            &["bash", "str_replace_editor", "submit"]
        } else {
            &["bash", "submit"]
        }
    }
}

/// `agent.history_processor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryProcessorConfig {
    pub name: String,

    /// Tokens of conversation history kept in context
    pub window_size: u32,
}

/// One entry of `agent.tools`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,

    /// Commands the shell tool refuses to run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_commands: Option<Vec<String>>,
}

impl ToolConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            restricted_commands: None,
        }
    }

    pub fn shell() -> Self {
        Self {
            name: SHELL_TOOL.to_string(),
            restricted_commands: Some(default_restricted_commands()),
        }
    }

    pub fn is_shell(&self) -> bool {
        self.name == SHELL_TOOL
    }
}

pub fn default_restricted_commands() -> Vec<String> {
    ["rm -rf /", "mkfs", "shutdown", "reboot", ":(){ :|:& };:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `agent.runtime`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    #[serde(default)]
    pub parallel_tool_calls: bool,

    #[serde(default)]
    pub streaming: bool,

    #[serde(default)]
    pub batch_tool_calls: bool,

    #[serde(default)]
    pub response_cache: bool,

    #[serde(default)]
    pub retry_attempts: u32,
}

impl RuntimeOptions {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validate;

    fn sample() -> AgentSpec {
        AgentSpec {
            model: ModelConfig {
                name: "gpt-4o".to_string(),
                provider: Provider::OpenAi,
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 4096,
                timeout: 300,
                api_base: None,
                api_key_env: Some("OPENAI_API_KEY".to_string()),
            },
            parser: ParserConfig::tool_calling(),
            history_processor: HistoryProcessorConfig {
                name: "LastNObservations".to_string(),
                window_size: 2048,
            },
            tools: vec![ToolConfig::shell(), ToolConfig::named("submit")],
            cost_limit: Some(2.0),
            max_iterations: 50,
            runtime: RuntimeOptions::default(),
        }
    }

    #[test]
    fn test_sample_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_empty_tools_invalid() {
        let spec = AgentSpec {
            tools: vec![],
            ..sample()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_negative_cost_limit_invalid() {
        let spec = AgentSpec {
            cost_limit: Some(-1.0),
            ..sample()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_default_runtime_is_not_serialized() {
        let yaml = serde_yaml::to_string(&sample()).unwrap();
        assert!(!yaml.contains("runtime"));
    }

    #[test]
    fn test_required_tools_follow_parser() {
        assert!(ParserConfig::tool_calling()
            .required_tools()
            .contains(&"str_replace_editor"));
        assert_eq!(ParserConfig::thought_action().required_tools(), &["bash", "submit"]);
    }
}
