//! Tool registries

use agentcfg_config::ToolConfig;

/// Tools exposed through native function calling
pub const FUNCTION_CALLING_TOOLS: &[&str] = &[
    "bash",
    "str_replace_editor",
    "find_file",
    "search_dir",
    "search_file",
    "submit",
];

/// Tools driven by thought/action text parsing
pub const THOUGHT_ACTION_TOOLS: &[&str] = &[
    "bash",
    "open",
    "goto",
    "scroll_up",
    "scroll_down",
    "create",
    "edit",
    "find_file",
    "search_dir",
    "search_file",
    "submit",
];

/// Extra tools for a repository language
pub fn language_tools(language: &str) -> &'static [&'static str] {
    match language.trim().to_lowercase().as_str() {
        "python" => &["python_test_runner", "python_linter"],
        "javascript" | "typescript" | "js" | "ts" => &["npm_test_runner", "eslint"],
        "rust" => &["cargo_test_runner", "clippy"],
        "go" | "golang" => &["go_test_runner", "gofmt"],
        "java" | "kotlin" => &["gradle_test_runner"],
        "ruby" => &["rspec_runner"],
        _ => &[],
    }
}

/// Tool set for a parser mode, language, and preset-required extras.
///
/// Order: base registry, then language tools, then required tools not already present.
pub fn select_tools(
    function_calling: bool,
    language: Option<&str>,
    required: &[String],
) -> Vec<ToolConfig> {
    let base = if function_calling {
        FUNCTION_CALLING_TOOLS
    } else {
        THOUGHT_ACTION_TOOLS
    };

    let mut tools: Vec<ToolConfig> = Vec::new();
    let names = base
        .iter()
        .copied()
        .chain(language.map(language_tools).unwrap_or(&[]).iter().copied())
        .map(str::to_string)
        .chain(required.iter().cloned());
    for name in names {
        push_unique(&mut tools, &name);
    }
    tools
}

/// Tools from an explicit list (JSON strings or `{name, restricted_commands}` objects)
pub fn tools_from_json(value: &serde_json::Value) -> Option<Vec<ToolConfig>> {
    let items = value.as_array()?;
    let mut tools = Vec::new();
    for item in items {
        match item {
            serde_json::Value::String(name) => push_unique(&mut tools, name),
            serde_json::Value::Object(_) => {
                let tool: ToolConfig = serde_json::from_value(item.clone()).ok()?;
                if !tools.iter().any(|t: &ToolConfig| t.name == tool.name) {
                    tools.push(tool);
                }
            }
            _ => return None,
        }
    }
    (!tools.is_empty()).then_some(tools)
}

fn push_unique(tools: &mut Vec<ToolConfig>, name: &str) {
    if tools.iter().any(|t| t.name == name) {
        return;
    }
    let tool = if name == agentcfg_config::SHELL_TOOL {
        ToolConfig::shell()
    } else {
        ToolConfig::named(name)
    };
    tools.push(tool);
}
