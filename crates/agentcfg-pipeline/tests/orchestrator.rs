use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{AgentConfiguration, Settings};
use agentcfg_core::generator::{IssueContext, PullRequestContext};
use agentcfg_core::{
    PlatformContext, ProblemContext, RawEnvironment, SchemaValidator, ValidationOptions,
};
use agentcfg_pipeline::{
    ConfigOrchestrator, ContextIntegration, IntegratedContext, OrchestratorOptions,
    PackageSummary, Preset,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const OPENAI_KEY: &str = "sk-proj-abcdefghijklmnopqrstuvwxyz123456";

fn platform() -> PlatformContext {
    PlatformContext::from_env(RawEnvironment::from_pairs([
        ("GITHUB_REPOSITORY", "acme/widgets"),
        ("GITHUB_SHA", "abc123"),
        ("GITHUB_EVENT_NAME", "pull_request"),
        ("OPENAI_API_KEY", OPENAI_KEY),
    ]))
}

fn pull_request() -> ProblemContext {
    ProblemContext {
        pull_request: Some(PullRequestContext {
            number: 17,
            title: "Add retry to the uploader".to_string(),
            body: Some("Retries failed chunk uploads".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn no_optimization() -> OrchestratorOptions {
    OrchestratorOptions {
        optimize: false,
        ..Default::default()
    }
}

struct FailingIntegration;

#[async_trait]
impl ContextIntegration for FailingIntegration {
    async fn integrate(
        &self,
        _platform: &PlatformContext,
        _payload: Option<&serde_json::Value>,
    ) -> anyhow::Result<IntegratedContext> {
        anyhow::bail!("metadata service unavailable")
    }
}

struct PanickingIntegration;

#[async_trait]
impl ContextIntegration for PanickingIntegration {
    async fn integrate(
        &self,
        _platform: &PlatformContext,
        _payload: Option<&serde_json::Value>,
    ) -> anyhow::Result<IntegratedContext> {
        panic!("integration bug")
    }
}

#[tokio::test]
async fn empty_inputs_still_produce_a_configuration() {
    let orchestrator = ConfigOrchestrator::default();
    let package = orchestrator
        .generate_configuration(
            &PlatformContext::default(),
            &ProblemContext::default(),
            &OrchestratorOptions::default(),
        )
        .await;

    assert!(!package.config.agent.model.name.is_empty());
    assert!(!package.config.agent.tools.is_empty());
    assert!(package.config.metadata.fallback);
    assert!(!package.is_emergency());
    assert!(package.yaml_text.contains("problem_statement:"));
}

#[tokio::test]
async fn pr_review_preset_sets_ceilings() {
    let orchestrator = ConfigOrchestrator::default();
    let options = no_optimization().with_preset(Preset::PrReview);
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &options)
        .await;

    let validation = package.validation.as_ref().unwrap();
    assert!(validation.valid, "{:?}", validation.errors);
    assert_eq!(package.config.agent.model.max_tokens, 16384);
    assert_eq!(package.config.agent.max_iterations, 40);
    assert!(package.config.agent.has_tool("git_diff"));
    assert_eq!(package.metadata.preset.as_deref(), Some("pr_review"));
    assert_eq!(package.config.metadata.preset.as_deref(), Some("pr_review"));
}

#[tokio::test]
async fn yaml_round_trips_to_the_same_document() {
    let orchestrator = ConfigOrchestrator::default();
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &OrchestratorOptions::default())
        .await;
    let parsed: AgentConfiguration = yaml::parse(&package.yaml_text).unwrap();
    assert_eq!(parsed, package.config);
    assert!(!package.yaml_text.contains(OPENAI_KEY));
}

#[tokio::test]
async fn optimization_is_recorded_in_the_package() {
    let orchestrator = ConfigOrchestrator::default();
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &OrchestratorOptions::default())
        .await;
    let optimization = package.optimization.as_ref().unwrap();
    assert_eq!(optimization.optimized_config, package.config);
    assert_eq!(
        optimization.original_config.problem_statement,
        package.config.problem_statement
    );
}

#[tokio::test]
async fn packages_are_cached_per_event() {
    let orchestrator = ConfigOrchestrator::default();
    let options = no_optimization();
    let first = orchestrator
        .generate_configuration(&platform(), &pull_request(), &options)
        .await;
    let second = orchestrator
        .generate_configuration(&platform(), &pull_request(), &options)
        .await;
    assert!(!first.metadata.cached);
    assert!(second.metadata.cached);
    assert_eq!(first.config, second.config);
    assert_eq!(first.metadata.cache_key, second.metadata.cache_key);

    let other = orchestrator
        .generate_configuration(&platform(), &pull_request(), &options.with_preset(Preset::CodeFix))
        .await;
    assert!(!other.metadata.cached);
}

#[tokio::test]
async fn integration_failure_yields_emergency_package() {
    let orchestrator =
        ConfigOrchestrator::with_integration(Settings::default(), Arc::new(FailingIntegration));
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &OrchestratorOptions::default())
        .await;
    assert!(package.is_emergency());
    assert!(package.config.metadata.error_fallback);
    assert!(package
        .metadata
        .error
        .as_deref()
        .unwrap()
        .contains("metadata service unavailable"));
    assert!(package.validation.is_none());
    assert_eq!(package.config.agent.model.name, "gpt-4o-mini");
}

#[tokio::test]
async fn panics_are_contained() {
    let orchestrator =
        ConfigOrchestrator::with_integration(Settings::default(), Arc::new(PanickingIntegration));
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &OrchestratorOptions::default())
        .await;
    assert!(package.is_emergency());
    assert!(package.metadata.error.as_deref().unwrap().contains("integration bug"));
}

#[tokio::test]
async fn history_keeps_events_per_repository() {
    let mut settings = Settings::default();
    settings.cache.history_limit = 2;
    let orchestrator = ConfigOrchestrator::new(settings);
    let options = OrchestratorOptions {
        use_cache: false,
        ..no_optimization()
    };
    for _ in 0..3 {
        orchestrator
            .generate_configuration(&platform(), &pull_request(), &options)
            .await;
    }
    let events = orchestrator.history("acme/widgets");
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.provider == "openai" && !e.error_fallback));
    assert!(orchestrator.history("acme/gears").is_empty());
}

#[tokio::test]
async fn webhook_selects_preset_from_labels() {
    let orchestrator = ConfigOrchestrator::default();
    let payload = json!({
        "action": "opened",
        "repository": {"full_name": "acme/widgets", "html_url": "https://github.com/acme/widgets"},
        "issue": {
            "number": 42,
            "title": "Upload crashes on empty file",
            "labels": [{"name": "bug"}]
        }
    });
    let env = RawEnvironment::from_pairs([("OPENAI_API_KEY", OPENAI_KEY)]);
    let package = orchestrator
        .handle_webhook_configuration("issues", &payload, env, &no_optimization())
        .await;

    assert_eq!(package.metadata.preset.as_deref(), Some("code_fix"));
    assert_eq!(package.config.agent.max_iterations, 60);
    assert_eq!(package.config.problem_statement.id, "widgets-42");
    assert_eq!(package.metadata.event.as_deref(), Some("issues"));
}

#[tokio::test]
async fn malformed_webhook_yields_emergency_package() {
    let orchestrator = ConfigOrchestrator::default();
    let payload = json!({"issue": {"number": "forty-two"}});
    let package = orchestrator
        .handle_webhook_configuration(
            "issues",
            &payload,
            RawEnvironment::default(),
            &OrchestratorOptions::default(),
        )
        .await;
    assert!(package.is_emergency());
}

#[tokio::test]
async fn ci_adapter_exposes_step_outputs() {
    let orchestrator = ConfigOrchestrator::default();
    let env = RawEnvironment::from_pairs([
        ("GITHUB_REPOSITORY", "acme/widgets"),
        ("GITHUB_EVENT_NAME", "issues"),
        ("OPENAI_API_KEY", OPENAI_KEY),
    ]);
    let problem = ProblemContext {
        issue: Some(IssueContext {
            number: 3,
            title: "Document the retry policy".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let plan = orchestrator
        .prepare_orchestration_configuration(env, &problem, &no_optimization())
        .await;
    assert_eq!(plan.outputs["provider"], "openai");
    assert_eq!(plan.outputs["config_file"], "agent_config.yaml");
    assert_eq!(plan.outputs["error_fallback"], "false");
    assert_eq!(plan.package.metadata.repository.as_deref(), Some("acme/widgets"));
}

#[tokio::test]
async fn artifacts_are_written_to_disk() {
    let orchestrator = ConfigOrchestrator::default();
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &OrchestratorOptions::default())
        .await;
    let dir = tempfile::tempdir().unwrap();
    let written = package.write_to(dir.path()).await.unwrap();
    assert_eq!(written.len(), 3);
    let yaml_text = std::fs::read_to_string(dir.path().join("agent_config.yaml")).unwrap();
    assert_eq!(yaml_text, package.yaml_text);
    assert!(package
        .artifacts
        .env_vars
        .values()
        .all(|v| !v.contains(OPENAI_KEY)));
}

#[tokio::test]
async fn summary_never_exposes_secrets() {
    let orchestrator = ConfigOrchestrator::default();
    let package = orchestrator
        .generate_configuration(&platform(), &pull_request(), &OrchestratorOptions::default())
        .await;
    let summary = PackageSummary::from_package(&package);
    let text = summary.to_markdown();
    assert!(text.contains("**Agent configuration**"));
    assert!(!text.contains(OPENAI_KEY));
    assert!(!text.contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn key_pasted_into_an_issue_never_reaches_the_handoff() {
    let leaked = "sk-proj-ZZZZZZZZZZZZZZZZZZZZZZZZZZZZ";
    let problem = ProblemContext {
        issue: Some(IssueContext {
            number: 9,
            title: "Uploads fail".to_string(),
            body: Some(format!("my key is {} and it fails", leaked)),
            ..Default::default()
        }),
        ..Default::default()
    };
    let orchestrator = ConfigOrchestrator::default();
    let package = orchestrator
        .generate_configuration(&platform(), &problem, &OrchestratorOptions::default())
        .await;

    let validation = package.validation.as_ref().unwrap();
    assert!(!validation.valid);
    assert!(package.config.metadata.fallback);
    assert!(!package.is_emergency());
    assert!(!package.yaml_text.contains(leaked));
    assert!(!serde_json::to_string(&package.config).unwrap().contains(leaked));
    assert!(package.config.problem_statement.text.contains("my key is sk-pro***"));

    let recheck = SchemaValidator::default().validate_configuration(
        &package.config,
        &ValidationOptions {
            use_cache: false,
            ..Default::default()
        },
    );
    assert!(recheck.valid, "{:?}", recheck.errors);
}

#[tokio::test]
async fn comment_command_scopes_a_bug_report() {
    let orchestrator = ConfigOrchestrator::default();
    let payload = json!({
        "action": "created",
        "repository": {"full_name": "acme/widgets", "html_url": "https://github.com/acme/widgets"},
        "issue": {
            "number": 12,
            "title": "Crash",
            "labels": [{"name": "bug"}]
        },
        "comment": {"body": "@swe-agent analyze", "user": {"login": "octocat"}}
    });
    let env = RawEnvironment::from_pairs([("OPENAI_API_KEY", OPENAI_KEY)]);
    let package = orchestrator
        .handle_webhook_configuration("issue_comment", &payload, env, &no_optimization())
        .await;

    let statement = &package.config.problem_statement;
    assert_eq!(package.metadata.problem_type, "bug_fix");
    assert!(statement
        .text
        .starts_with("Analyze this issue and provide insights, but do not propose code changes:"));
    assert!(statement.text.contains("Issue Title: Crash"));
}

#[tokio::test]
async fn comment_command_scopes_a_pull_request() {
    let orchestrator = ConfigOrchestrator::default();
    let problem = ProblemContext {
        comment: Some(agentcfg_core::generator::CommentContext {
            author: "octocat".to_string(),
            body: "/analyze".to_string(),
        }),
        ..pull_request()
    };
    let package = orchestrator
        .generate_configuration(&platform(), &problem, &no_optimization())
        .await;
    assert_eq!(package.metadata.problem_type, "pull_request_review");
    assert!(package
        .config
        .problem_statement
        .text
        .starts_with("Analyze this issue and provide insights"));
}
