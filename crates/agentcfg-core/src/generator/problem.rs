//! Problem statement inference

use super::context::{CommentContext, IssueContext, ProblemContext};
use agentcfg_config::{ProblemStatement, ProblemType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Comments carried into the problem text
pub const CONVERSATION_DEPTH: usize = 5;

/// `@bot analyze` or `/analyze`, anywhere on a line
static COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:@[\w-]+[ \t]+|(?:^|\s)/)(analy[sz]e|fix|test|review)\b")
        .expect("valid regex")
});

/// Comment-driven commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Analyze,
    Fix,
    Test,
    Review,
}

impl Command {
    pub fn problem_type(&self) -> ProblemType {
        match self {
            Command::Analyze => ProblemType::Analysis,
            Command::Fix => ProblemType::FixRequest,
            Command::Test => ProblemType::TestRequest,
            Command::Review => ProblemType::CodeReview,
        }
    }

    /// Instruction prepended to the problem text
    pub fn instruction(&self) -> &'static str {
        match self {
            Command::Analyze => {
                "Analyze this issue and provide insights, but do not propose code changes:"
            }
            Command::Fix => "Analyze and fix this issue:",
            Command::Test => "Run relevant tests and report results:",
            Command::Review => "Review the current code/changes and provide feedback:",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Analyze => "analyze",
            Command::Fix => "fix",
            Command::Test => "test",
            Command::Review => "review",
        }
    }
}

/// First command keyword in `text`
pub fn detect_command(text: &str) -> Option<Command> {
    let captures = COMMAND.captures(text)?;
    match captures.get(1)?.as_str().to_lowercase().as_str() {
        "analyze" | "analyse" => Some(Command::Analyze),
        "fix" => Some(Command::Fix),
        "test" => Some(Command::Test),
        "review" => Some(Command::Review),
        _ => None,
    }
}

/// Problem type decided by which event fields are present.
///
/// Pull request, then bug label, then a command keyword (comment or trigger, only
/// outside pull requests), then feature label, else general analysis.
pub fn infer_problem_type(problem: &ProblemContext) -> ProblemType {
    if problem.pull_request.is_some() {
        return ProblemType::PullRequestReview;
    }
    if problem.issue.as_ref().is_some_and(|i| i.has_label("bug")) {
        return ProblemType::BugFix;
    }
    if let Some(command) = command_of(problem) {
        return command.problem_type();
    }
    if problem
        .issue
        .as_ref()
        .is_some_and(|i| i.has_label("enhancement") || i.has_label("feature"))
    {
        return ProblemType::FeatureRequest;
    }
    ProblemType::GeneralAnalysis
}

fn command_of(problem: &ProblemContext) -> Option<Command> {
    problem
        .comment
        .as_ref()
        .and_then(|c| detect_command(&c.body))
        .or_else(|| {
            problem
                .trigger
                .as_ref()
                .and_then(|t| t.text.as_deref())
                .and_then(detect_command)
        })
}

/// Build `problem_statement` from the event and repository identity
pub fn build_problem_statement(
    problem: &ProblemContext,
    repo_name: Option<&str>,
    run_id: Option<&str>,
) -> ProblemStatement {
    let kind = infer_problem_type(problem);

    let mut text = base_text(problem);
    // a command always scopes the task, even when labels or a PR decided the type
    if let Some(command) = command_of(problem) {
        text = format!("{}\n\n{}", command.instruction(), text);
    }

    let (title, labels, url) = match (&problem.pull_request, &problem.issue) {
        (Some(pr), _) => (Some(pr.title.clone()), pr.labels.clone(), pr.url.clone()),
        (None, Some(issue)) => (
            Some(issue.title.clone()),
            issue.labels.clone(),
            issue.url.clone(),
        ),
        (None, None) => (None, Vec::new(), None),
    };

    ProblemStatement {
        kind,
        id: instance_id(repo_name, problem.number(), run_id),
        text,
        title: title.filter(|t| !t.is_empty()),
        labels,
        url,
    }
}

/// `<repo-name>-<number>`, falling back to the run id, then to the repo name
pub fn instance_id(repo_name: Option<&str>, number: Option<u64>, run_id: Option<&str>) -> String {
    let name = repo_name.unwrap_or("unknown");
    match (number, run_id) {
        (Some(n), _) => format!("{}-{}", name, n),
        (None, Some(run)) => format!("{}-run-{}", name, run),
        (None, None) => name.to_string(),
    }
}

fn base_text(problem: &ProblemContext) -> String {
    if let Some(pr) = &problem.pull_request {
        let mut text = format!("Pull Request #{}: {}", pr.number, pr.title);
        if let Some(body) = pr.body.as_deref().filter(|b| !b.trim().is_empty()) {
            text.push_str("\n\n");
            text.push_str(body.trim());
        }
        if let (Some(head), Some(base)) = (&pr.head_ref, &pr.base_ref) {
            text.push_str(&format!("\n\nChanges: {} -> {}", head, base));
        }
        return text;
    }

    if let Some(issue) = &problem.issue {
        return issue_text(issue);
    }

    if let Some(comment) = &problem.comment {
        return comment.body.trim().to_string();
    }

    if let Some(text) = problem
        .trigger
        .as_ref()
        .and_then(|t| t.text.as_deref())
        .filter(|t| !t.trim().is_empty())
    {
        return text.trim().to_string();
    }

    ProblemStatement::default().text
}

fn issue_text(issue: &IssueContext) -> String {
    let mut text = format!("Issue Title: {}", issue.title);
    let body = issue
        .body
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or("No description provided.");
    text.push_str("\n\nIssue Description:\n");
    text.push_str(body);

    if !issue.comments.is_empty() {
        text.push_str("\n\nRecent conversation:");
        for comment in recent(&issue.comments) {
            text.push_str(&format!("\n@{}: {}", comment.author, comment.body.trim()));
        }
    }
    text
}

fn recent(comments: &[CommentContext]) -> &[CommentContext] {
    let start = comments.len().saturating_sub(CONVERSATION_DEPTH);
    &comments[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::context::{PullRequestContext, TriggerContext};

    fn issue(labels: &[&str]) -> IssueContext {
        IssueContext {
            number: 42,
            title: "Crash on start".to_string(),
            body: Some("It crashes.".to_string()),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    fn comment(body: &str) -> CommentContext {
        CommentContext {
            author: "octocat".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_detect_command_forms() {
        assert_eq!(detect_command("@swe-agent fix this"), Some(Command::Fix));
        assert_eq!(detect_command("please /review"), Some(Command::Review));
        assert_eq!(detect_command("@bot analyse the logs"), Some(Command::Analyze));
        assert_eq!(detect_command("/TEST now"), Some(Command::Test));
        assert_eq!(detect_command("this needs a fix"), None);
        assert_eq!(detect_command("a/fix path"), None);
    }

    #[test]
    fn test_pull_request_wins() {
        let problem = ProblemContext {
            pull_request: Some(PullRequestContext {
                number: 7,
                title: "Add cache".to_string(),
                ..Default::default()
            }),
            issue: Some(issue(&["bug"])),
            comment: Some(comment("@bot fix")),
            ..Default::default()
        };
        let statement = build_problem_statement(&problem, Some("widgets"), None);
        assert_eq!(statement.kind, ProblemType::PullRequestReview);
        assert_eq!(statement.id, "widgets-7");
        assert!(statement.text.starts_with("Analyze and fix this issue:"));
        assert!(statement.text.contains("Pull Request #7: Add cache"));
    }

    #[test]
    fn test_command_instruction_on_pull_request() {
        let problem = ProblemContext {
            pull_request: Some(PullRequestContext {
                number: 4,
                title: "X".to_string(),
                ..Default::default()
            }),
            comment: Some(comment("/analyze")),
            ..Default::default()
        };
        let statement = build_problem_statement(&problem, Some("widgets"), None);
        assert_eq!(statement.kind, ProblemType::PullRequestReview);
        assert_eq!(
            statement.text,
            format!("{}\n\nPull Request #4: X", Command::Analyze.instruction())
        );
    }

    #[test]
    fn test_command_instruction_on_bug_issue() {
        let problem = ProblemContext {
            issue: Some(issue(&["bug"])),
            comment: Some(comment("@swe-agent analyze")),
            ..Default::default()
        };
        let statement = build_problem_statement(&problem, Some("widgets"), None);
        assert_eq!(statement.kind, ProblemType::BugFix);
        assert!(statement
            .text
            .starts_with("Analyze this issue and provide insights, but do not propose code changes:"));
        assert!(statement.text.contains("Issue Title: Crash on start"));
    }

    #[test]
    fn test_bug_label_before_command() {
        let problem = ProblemContext {
            issue: Some(issue(&["Bug"])),
            comment: Some(comment("@bot test")),
            ..Default::default()
        };
        assert_eq!(infer_problem_type(&problem), ProblemType::BugFix);
    }

    #[test]
    fn test_command_before_feature_label() {
        let problem = ProblemContext {
            issue: Some(issue(&["enhancement"])),
            comment: Some(comment("/analyze")),
            ..Default::default()
        };
        let statement = build_problem_statement(&problem, Some("widgets"), None);
        assert_eq!(statement.kind, ProblemType::Analysis);
        assert!(statement.text.starts_with("Analyze this issue and provide insights"));
        assert!(statement.text.contains("Issue Title: Crash on start"));
    }

    #[test]
    fn test_feature_label() {
        let problem = ProblemContext {
            issue: Some(issue(&["feature"])),
            ..Default::default()
        };
        assert_eq!(infer_problem_type(&problem), ProblemType::FeatureRequest);
    }

    #[test]
    fn test_trigger_and_empty_context() {
        let problem = ProblemContext {
            trigger: Some(TriggerContext {
                source: Some("workflow_dispatch".to_string()),
                text: Some("/fix the flaky test".to_string()),
            }),
            ..Default::default()
        };
        let statement = build_problem_statement(&problem, Some("widgets"), Some("99"));
        assert_eq!(statement.kind, ProblemType::FixRequest);
        assert_eq!(statement.id, "widgets-run-99");

        let empty = build_problem_statement(&ProblemContext::default(), None, None);
        assert_eq!(empty.kind, ProblemType::GeneralAnalysis);
        assert_eq!(empty.id, "unknown");
    }

    #[test]
    fn test_conversation_keeps_last_five() {
        let mut with_comments = issue(&[]);
        with_comments.comments = (1..=7)
            .map(|n| CommentContext {
                author: format!("user{}", n),
                body: format!("comment {}", n),
            })
            .collect();
        let problem = ProblemContext {
            issue: Some(with_comments),
            ..Default::default()
        };
        let statement = build_problem_statement(&problem, Some("widgets"), None);
        assert!(!statement.text.contains("@user2: comment 2"));
        assert!(statement.text.contains("@user3: comment 3"));
        assert!(statement.text.contains("@user7: comment 7"));
        assert_eq!(statement.kind, ProblemType::GeneralAnalysis);
    }
}
