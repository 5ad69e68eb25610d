//! Inputs of the generator: CI platform context and the triggering event

use crate::error::GenerationError;
use crate::mapper::RawEnvironment;
use serde::{Deserialize, Serialize};

/// CI/platform identity of one invocation
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    /// `owner/name`
    pub repository: Option<String>,
    pub server_url: Option<String>,
    pub git_ref: Option<String>,
    pub sha: Option<String>,
    pub actor: Option<String>,
    pub event_name: Option<String>,
    pub run_id: Option<String>,
    pub env: RawEnvironment,
}

impl PlatformContext {
    /// Identity from the standard `GITHUB_*` variables of `env`
    pub fn from_env(env: RawEnvironment) -> Self {
        let get = |name: &str| env.get(name).map(str::to_string);
        Self {
            repository: get("GITHUB_REPOSITORY"),
            server_url: get("GITHUB_SERVER_URL"),
            git_ref: get("GITHUB_REF"),
            sha: get("GITHUB_SHA"),
            actor: get("GITHUB_ACTOR"),
            event_name: get("GITHUB_EVENT_NAME"),
            run_id: get("GITHUB_RUN_ID"),
            env,
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_event(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }
}

/// Split `owner/name`, tolerating a trailing `.git`
pub fn parse_repository(value: &str) -> Result<(String, String), GenerationError> {
    let trimmed = value.trim().trim_end_matches(".git");
    match trimmed.split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(GenerationError::InvalidRepository {
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueContext {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Conversation so far, oldest first
    #[serde(default)]
    pub comments: Vec<CommentContext>,
    #[serde(default)]
    pub url: Option<String>,
}

impl IssueContext {
    pub fn has_label(&self, wanted: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(wanted))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestContext {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub head_ref: Option<String>,
    #[serde(default)]
    pub base_ref: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentContext {
    #[serde(default)]
    pub author: String,
    pub body: String,
}

/// Manual or scheduled trigger carrying free text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The triggering event; the fields present decide the problem type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemContext {
    #[serde(default)]
    pub issue: Option<IssueContext>,
    #[serde(default)]
    pub pull_request: Option<PullRequestContext>,
    #[serde(default)]
    pub comment: Option<CommentContext>,
    #[serde(default)]
    pub trigger: Option<TriggerContext>,
}

impl ProblemContext {
    pub fn is_empty(&self) -> bool {
        self.issue.is_none()
            && self.pull_request.is_none()
            && self.comment.is_none()
            && self.trigger.is_none()
    }

    /// Issue or pull request number, preferring the pull request
    pub fn number(&self) -> Option<u64> {
        self.pull_request
            .as_ref()
            .map(|pr| pr.number)
            .or_else(|| self.issue.as_ref().map(|i| i.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        assert_eq!(
            parse_repository("acme/widgets").unwrap(),
            ("acme".to_string(), "widgets".to_string())
        );
        assert_eq!(
            parse_repository("acme/widgets.git").unwrap().1,
            "widgets".to_string()
        );
        assert!(parse_repository("widgets").is_err());
        assert!(parse_repository("a/b/c").is_err());
        assert!(parse_repository("/b").is_err());
    }

    #[test]
    fn test_platform_from_env() {
        let env = RawEnvironment::from_pairs(vec![
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("GITHUB_SHA", "abc123"),
            ("GITHUB_EVENT_NAME", "issues"),
        ]);
        let platform = PlatformContext::from_env(env);
        assert_eq!(platform.repository.as_deref(), Some("acme/widgets"));
        assert_eq!(platform.sha.as_deref(), Some("abc123"));
        assert_eq!(platform.event_name.as_deref(), Some("issues"));
        assert!(platform.actor.is_none());
    }

    #[test]
    fn test_number_prefers_pull_request() {
        let problem = ProblemContext {
            issue: Some(IssueContext {
                number: 3,
                ..Default::default()
            }),
            pull_request: Some(PullRequestContext {
                number: 9,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(problem.number(), Some(9));
        assert!(ProblemContext::default().is_empty());
    }
}
