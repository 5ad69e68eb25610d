use agentcfg_config::loader::formats::yaml;
use agentcfg_config::{
    AgentConfiguration, ModalConfig, OptimizationMode, ParserConfig, PerformanceProfile, Provider,
    ValidationMode, TOOL_CALLING_PARSER,
};
use agentcfg_core::generator::IssueContext;
use agentcfg_core::validator::Bottleneck;
use agentcfg_core::{
    ConfigGenerator, CostPerformanceOptimizer, EnvironmentMapper, GeneratorOptions,
    OptimizationOptions, PlatformContext, ProblemContext, RawEnvironment, SchemaValidator,
    ValidationOptions,
};
use pretty_assertions::assert_eq;

const OPENAI_KEY: &str = "sk-proj-abcdefghijklmnopqrstuvwxyz123456";

fn environment() -> RawEnvironment {
    RawEnvironment::from_pairs([
        ("GITHUB_REPOSITORY", "acme/widgets"),
        ("GITHUB_SHA", "abc123"),
        ("OPENAI_API_KEY", OPENAI_KEY),
        ("SWE_AGENT_COST_LIMIT", "3.5"),
        ("SWE_AGENT_ENV_VARS", r#"{"CI": "1"}"#),
        ("UNRELATED_VARIABLE", "ignored"),
    ])
}

fn issue() -> ProblemContext {
    ProblemContext {
        issue: Some(IssueContext {
            number: 8,
            title: "Uploads stall on slow links".to_string(),
            body: Some("Chunks are never retried".to_string()),
            labels: vec!["bug".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn generated() -> AgentConfiguration {
    ConfigGenerator::new()
        .generate_configuration(
            &PlatformContext::from_env(environment()),
            &issue(),
            &GeneratorOptions::default(),
        )
        .unwrap()
        .config
}

fn production() -> ValidationOptions {
    ValidationOptions {
        use_cache: false,
        ..Default::default()
    }
}

#[test]
fn mapping_is_idempotent() {
    let mapper = EnvironmentMapper::new();
    let env = environment();
    let first = mapper.map_environment(&env);
    let second = mapper.map_environment(&env);
    assert_eq!(first.config.to_tree(), second.config.to_tree());
    assert_eq!(first.errors, second.errors);
    assert!(first.is_complete());
}

#[test]
fn generated_document_validates_in_production() {
    let config = generated();
    let result = SchemaValidator::default().validate_configuration(&config, &production());
    assert!(result.valid, "{:?}", result.errors);
    assert!(result.fallback.is_none());
    assert_eq!(result.metadata.stages_run.len(), 5);
    assert_eq!(config.agent.cost_limit, Some(3.5));
}

#[test]
fn yaml_round_trip_reproduces_the_document() {
    let config = generated();
    let text = yaml::to_string(&config).unwrap();
    let parsed: AgentConfiguration = yaml::parse(&text).unwrap();
    assert_eq!(parsed, config);
    assert!(!text.contains(OPENAI_KEY));
}

#[test]
fn tool_calling_parser_without_function_calling_is_rejected() {
    let mut config = generated();
    config.agent.parser = ParserConfig {
        name: TOOL_CALLING_PARSER.to_string(),
        function_calling: false,
    };
    let result = SchemaValidator::default().validate_configuration(&config, &production());
    assert!(!result.valid);
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "agent.parser.function_calling"));
    let fallback = result.fallback.unwrap();
    assert!(fallback.metadata.fallback);
    assert_eq!(fallback.problem_statement, config.problem_statement);
}

#[test]
fn docker_and_modal_together_are_rejected() {
    let mut config = generated();
    config.env.modal = Some(ModalConfig {
        image: "python:3.11".to_string(),
        cpu: 2.0,
        memory: 4096,
        timeout: 1800,
    });
    let result = SchemaValidator::default().validate_configuration(
        &config,
        &ValidationOptions {
            mode: ValidationMode::Development,
            ..production()
        },
    );
    assert!(!result.valid);
    assert!(result
        .error_messages()
        .iter()
        .any(|m| m.contains("mutually exclusive")));
}

#[test]
fn oversized_history_window_is_a_bottleneck() {
    let mut config = generated();
    config.agent.model.max_tokens = 8192;
    config.agent.history_processor.window_size = 7000;
    let result = SchemaValidator::default().validate_configuration(&config, &production());
    assert!(result.has_bottleneck(Bottleneck::ContextOverflow));
    assert!(result.valid);
}

#[test]
fn optimized_document_respects_every_profile() {
    let mut config = generated();
    config.agent.model.max_tokens = 16384;
    config.agent.model.timeout = 900;
    config.agent.max_iterations = 150;
    let optimizer = CostPerformanceOptimizer::default();

    for profile in [
        PerformanceProfile::Fast,
        PerformanceProfile::Balanced,
        PerformanceProfile::Thorough,
    ] {
        for mode in [
            OptimizationMode::Aggressive,
            OptimizationMode::Conservative,
            OptimizationMode::Balanced,
            OptimizationMode::CostFocused,
            OptimizationMode::PerformanceFocused,
        ] {
            let options = OptimizationOptions {
                mode,
                profile: Some(profile),
                apply_manual: true,
                use_cache: false,
            };
            let result = optimizer.optimize_configuration(&config, &options);
            let ceilings = profile.ceilings();
            let agent = &result.optimized_config.agent;
            assert!(agent.model.max_tokens <= ceilings.max_tokens, "{:?}/{:?}", profile, mode);
            assert!(agent.model.timeout <= ceilings.timeout, "{:?}/{:?}", profile, mode);
            assert!(agent.max_iterations <= ceilings.max_iterations, "{:?}/{:?}", profile, mode);
        }
    }
}

#[test]
fn optimized_document_still_validates() {
    let config = generated();
    let options = OptimizationOptions {
        mode: OptimizationMode::Aggressive,
        use_cache: false,
        ..Default::default()
    };
    let result = CostPerformanceOptimizer::default().optimize_configuration(&config, &options);
    assert!(!result.recommendations.is_empty());
    assert_eq!(result.optimized_config.agent.model.provider, Provider::OpenAi);

    let validation =
        SchemaValidator::default().validate_configuration(&result.optimized_config, &production());
    assert!(validation.valid, "{:?}", validation.errors);
}
