//! Typed partial updates of an agent configuration

use agentcfg_config::{format_memory, AgentConfiguration};
use serde::Serialize;

/// Every field the optimizer may change; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_processor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    /// Sandbox memory in MB, applied to whichever deployment block exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f64>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `later` onto `self`; fields set in `later` win
    pub fn merge(mut self, later: &ConfigPatch) -> ConfigPatch {
        fn take<T: Clone>(slot: &mut Option<T>, later: &Option<T>) {
            if later.is_some() {
                *slot = later.clone();
            }
        }
        take(&mut self.model_name, &later.model_name);
        take(&mut self.max_tokens, &later.max_tokens);
        take(&mut self.model_timeout, &later.model_timeout);
        take(&mut self.max_iterations, &later.max_iterations);
        take(&mut self.window_size, &later.window_size);
        take(&mut self.history_processor, &later.history_processor);
        take(&mut self.parallel_tool_calls, &later.parallel_tool_calls);
        take(&mut self.streaming, &later.streaming);
        take(&mut self.batch_tool_calls, &later.batch_tool_calls);
        take(&mut self.response_cache, &later.response_cache);
        take(&mut self.retry_attempts, &later.retry_attempts);
        take(&mut self.memory_mb, &later.memory_mb);
        take(&mut self.cpus, &later.cpus);
        self
    }

    pub fn apply_to(&self, config: &mut AgentConfiguration) {
        let agent = &mut config.agent;
        if let Some(name) = &self.model_name {
            agent.model.name = name.clone();
        }
        if let Some(v) = self.max_tokens {
            agent.model.max_tokens = v;
        }
        if let Some(v) = self.model_timeout {
            agent.model.timeout = v;
        }
        if let Some(v) = self.max_iterations {
            agent.max_iterations = v;
        }
        if let Some(v) = self.window_size {
            agent.history_processor.window_size = v;
        }
        if let Some(name) = &self.history_processor {
            agent.history_processor.name = name.clone();
        }
        if let Some(v) = self.parallel_tool_calls {
            agent.runtime.parallel_tool_calls = v;
        }
        if let Some(v) = self.streaming {
            agent.runtime.streaming = v;
        }
        if let Some(v) = self.batch_tool_calls {
            agent.runtime.batch_tool_calls = v;
        }
        if let Some(v) = self.response_cache {
            agent.runtime.response_cache = v;
        }
        if let Some(v) = self.retry_attempts {
            agent.runtime.retry_attempts = v;
        }

        let env = &mut config.env;
        if let Some(mb) = self.memory_mb {
            if let Some(docker) = env.docker.as_mut() {
                docker.memory = format_memory(mb);
            }
            if let Some(modal) = env.modal.as_mut() {
                modal.memory = mb;
            }
        }
        if let Some(cpus) = self.cpus {
            if let Some(docker) = env.docker.as_mut() {
                docker.cpus = cpus;
            }
            if let Some(modal) = env.modal.as_mut() {
                modal.cpu = cpus;
            }
        }
    }

    /// The patch as `dot.path = value` pairs, for display
    pub fn assignments(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut push = |path: &str, value: Option<String>| {
            if let Some(value) = value {
                out.push((path.to_string(), value));
            }
        };
        push("agent.model.name", self.model_name.clone());
        push("agent.model.max_tokens", self.max_tokens.map(|v| v.to_string()));
        push("agent.model.timeout", self.model_timeout.map(|v| v.to_string()));
        push("agent.max_iterations", self.max_iterations.map(|v| v.to_string()));
        push(
            "agent.history_processor.window_size",
            self.window_size.map(|v| v.to_string()),
        );
        push("agent.history_processor.name", self.history_processor.clone());
        push(
            "agent.runtime.parallel_tool_calls",
            self.parallel_tool_calls.map(|v| v.to_string()),
        );
        push("agent.runtime.streaming", self.streaming.map(|v| v.to_string()));
        push(
            "agent.runtime.batch_tool_calls",
            self.batch_tool_calls.map(|v| v.to_string()),
        );
        push(
            "agent.runtime.response_cache",
            self.response_cache.map(|v| v.to_string()),
        );
        push(
            "agent.runtime.retry_attempts",
            self.retry_attempts.map(|v| v.to_string()),
        );
        push("env.memory", self.memory_mb.map(format_memory));
        push("env.cpus", self.cpus.map(|v| v.to_string()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::test_support::valid_config;

    #[test]
    fn test_later_patch_wins() {
        let first = ConfigPatch {
            max_iterations: Some(40),
            streaming: Some(true),
            ..Default::default()
        };
        let second = ConfigPatch {
            max_iterations: Some(25),
            ..Default::default()
        };
        let merged = first.merge(&second);
        assert_eq!(merged.max_iterations, Some(25));
        assert_eq!(merged.streaming, Some(true));
    }

    #[test]
    fn test_apply_touches_only_set_fields() {
        let mut config = valid_config();
        let before = config.clone();
        ConfigPatch {
            memory_mb: Some(8192),
            retry_attempts: Some(3),
            ..Default::default()
        }
        .apply_to(&mut config);

        assert_eq!(config.env.docker.as_ref().map(|d| d.memory.as_str()), Some("8g"));
        assert_eq!(config.agent.runtime.retry_attempts, 3);
        assert_eq!(config.agent.model, before.agent.model);
        assert_eq!(config.agent.max_iterations, before.agent.max_iterations);
    }

    #[test]
    fn test_assignments_list_set_fields() {
        let patch = ConfigPatch {
            model_name: Some("gpt-4o-mini".to_string()),
            memory_mb: Some(4096),
            ..Default::default()
        };
        assert_eq!(
            patch.assignments(),
            vec![
                ("agent.model.name".to_string(), "gpt-4o-mini".to_string()),
                ("env.memory".to_string(), "4g".to_string()),
            ]
        );
        assert!(ConfigPatch::default().assignments().is_empty());
    }
}
