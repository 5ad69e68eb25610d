//! Webhook payload adapter
//!
//! Derives the platform and problem contexts from a raw GitHub-style payload. Signature
//! verification happens upstream.

use crate::error::{OrchestrationError, Result};
use agentcfg_core::generator::{
    CommentContext, IssueContext, PlatformContext, ProblemContext, PullRequestContext,
    TriggerContext,
};
use agentcfg_core::RawEnvironment;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
struct Payload {
    action: Option<String>,
    repository: Option<RepositoryPayload>,
    sender: Option<UserPayload>,
    issue: Option<IssuePayload>,
    pull_request: Option<PullRequestPayload>,
    comment: Option<CommentPayload>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    after: Option<String>,
    inputs: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: String,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    number: u64,
    #[serde(default)]
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<LabelPayload>,
    html_url: Option<String>,
    /// Present when the issue is a pull request
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
    #[serde(default)]
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<LabelPayload>,
    html_url: Option<String>,
    head: Option<BranchPayload>,
    base: Option<BranchPayload>,
}

#[derive(Debug, Deserialize)]
struct CommentPayload {
    body: Option<String>,
    user: Option<UserPayload>,
}

/// Contexts derived from one webhook delivery
#[derive(Debug, Clone)]
pub struct WebhookContext {
    pub platform: PlatformContext,
    pub problem: ProblemContext,
    pub action: Option<String>,
}

fn label_names(labels: Vec<LabelPayload>) -> Vec<String> {
    labels.into_iter().map(|l| l.name).collect()
}

/// Parse `payload` for `event`; `env` supplies secrets and variables
pub fn parse_webhook(event: &str, payload: &Value, env: RawEnvironment) -> Result<WebhookContext> {
    let parsed: Payload =
        serde_json::from_value(payload.clone()).map_err(|source| OrchestrationError::Webhook {
            event: event.to_string(),
            source,
        })?;

    let mut platform = PlatformContext::from_env(env).with_event(event);
    if let Some(repo) = &parsed.repository {
        platform.repository = Some(repo.full_name.clone());
        if let Some(url) = &repo.html_url {
            // https://github.com/owner/name -> https://github.com
            let server = url.trim_end_matches('/').trim_end_matches(&repo.full_name);
            platform.server_url = Some(server.trim_end_matches('/').to_string());
        }
    }
    if let Some(sender) = &parsed.sender {
        platform.actor = Some(sender.login.clone());
    }

    let head = parsed.pull_request.as_ref().and_then(|pr| pr.head.as_ref());
    if let Some(sha) = head.and_then(|h| h.sha.clone()).or_else(|| parsed.after.clone()) {
        platform.sha = Some(sha);
    }
    if let Some(git_ref) = head.and_then(|h| h.git_ref.clone()).or_else(|| parsed.git_ref.clone()) {
        platform.git_ref = Some(git_ref);
    }

    let comment = parsed.comment.map(|c| CommentContext {
        author: c.user.map(|u| u.login).unwrap_or_default(),
        body: c.body.unwrap_or_default(),
    });

    let mut problem = ProblemContext {
        comment,
        ..Default::default()
    };

    if let Some(pr) = parsed.pull_request {
        problem.pull_request = Some(PullRequestContext {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            labels: label_names(pr.labels),
            head_ref: pr.head.and_then(|h| h.git_ref),
            base_ref: pr.base.and_then(|b| b.git_ref),
            url: pr.html_url,
        });
    }

    if let Some(issue) = parsed.issue {
        if issue.pull_request.is_some() && problem.pull_request.is_none() {
            // Comment on a pull request: the issue object stands in for the PR
            problem.pull_request = Some(PullRequestContext {
                number: issue.number,
                title: issue.title,
                body: issue.body,
                labels: label_names(issue.labels),
                url: issue.html_url,
                ..Default::default()
            });
        } else {
            problem.issue = Some(IssueContext {
                number: issue.number,
                title: issue.title,
                body: issue.body,
                labels: label_names(issue.labels),
                comments: vec![],
                url: issue.html_url,
            });
        }
    }

    if problem.is_empty() {
        let text = parsed
            .inputs
            .as_ref()
            .and_then(|i| i.get("prompt").or_else(|| i.get("problem_statement")))
            .and_then(Value::as_str)
            .map(str::to_string);
        if text.is_some() {
            problem.trigger = Some(TriggerContext {
                source: Some(event.to_string()),
                text,
            });
        }
    }

    Ok(WebhookContext {
        platform,
        problem,
        action: parsed.action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_comment_payload() {
        let payload = json!({
            "action": "created",
            "repository": {"full_name": "acme/widgets", "html_url": "https://github.com/acme/widgets"},
            "sender": {"login": "octocat"},
            "issue": {
                "number": 42,
                "title": "Crash on save",
                "body": "Stack trace attached",
                "labels": [{"name": "bug"}],
                "html_url": "https://github.com/acme/widgets/issues/42"
            },
            "comment": {"body": "@swe-agent fix", "user": {"login": "octocat"}}
        });
        let ctx = parse_webhook("issue_comment", &payload, RawEnvironment::default()).unwrap();
        assert_eq!(ctx.platform.repository.as_deref(), Some("acme/widgets"));
        assert_eq!(ctx.platform.server_url.as_deref(), Some("https://github.com"));
        assert_eq!(ctx.platform.event_name.as_deref(), Some("issue_comment"));
        assert_eq!(ctx.action.as_deref(), Some("created"));
        let issue = ctx.problem.issue.unwrap();
        assert_eq!(issue.labels, vec!["bug".to_string()]);
        assert_eq!(ctx.problem.comment.unwrap().author, "octocat");
    }

    #[test]
    fn test_comment_on_pull_request_becomes_pr_context() {
        let payload = json!({
            "repository": {"full_name": "acme/widgets"},
            "issue": {"number": 9, "title": "Add cache", "pull_request": {"url": "x"}},
            "comment": {"body": "/review"}
        });
        let ctx = parse_webhook("issue_comment", &payload, RawEnvironment::default()).unwrap();
        assert!(ctx.problem.issue.is_none());
        assert_eq!(ctx.problem.pull_request.unwrap().number, 9);
    }

    #[test]
    fn test_pull_request_refs() {
        let payload = json!({
            "action": "opened",
            "repository": {"full_name": "acme/widgets"},
            "pull_request": {
                "number": 5,
                "title": "Refactor",
                "head": {"ref": "feature", "sha": "abc123"},
                "base": {"ref": "main"}
            }
        });
        let ctx = parse_webhook("pull_request", &payload, RawEnvironment::default()).unwrap();
        assert_eq!(ctx.platform.sha.as_deref(), Some("abc123"));
        assert_eq!(ctx.platform.git_ref.as_deref(), Some("feature"));
        assert_eq!(ctx.problem.pull_request.unwrap().base_ref.as_deref(), Some("main"));
    }

    #[test]
    fn test_dispatch_inputs_become_trigger() {
        let payload = json!({
            "repository": {"full_name": "acme/widgets"},
            "inputs": {"prompt": "Audit error handling"}
        });
        let ctx = parse_webhook("workflow_dispatch", &payload, RawEnvironment::default()).unwrap();
        assert_eq!(
            ctx.problem.trigger.unwrap().text.as_deref(),
            Some("Audit error handling")
        );
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let payload = json!({"issue": {"number": "not a number"}});
        assert!(parse_webhook("issues", &payload, RawEnvironment::default()).is_err());
    }
}
