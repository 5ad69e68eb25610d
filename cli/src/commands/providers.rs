use super::ui::print_header;
use agentcfg_core::providers::{self, ProviderProfile};
use agentcfg_core::RawEnvironment;
use anyhow::Result;
use yansi::Paint;

pub fn handle_providers() -> Result<()> {
    let env = RawEnvironment::from_process();
    let active = providers::provider_with_secret(&env);

    print_header("Providers");
    for profile in providers::profiles() {
        let status = key_status(profile, &env);
        let name = if Some(profile.provider) == active {
            format!("{} (active)", profile.provider).green().bold().to_string()
        } else {
            profile.provider.as_str().bold().to_string()
        };
        println!("{} {}", name, status);
        println!(
            "    {} {}  {} {}",
            "default:".dim(),
            profile.default_model,
            "parser:".dim(),
            profile.parser
        );
        for model in profile.models {
            println!(
                "    {:<36} ${:.5}/${:.5} per 1K  max {}",
                model.name, model.input_per_1k, model.output_per_1k, model.max_tokens
            );
        }
    }
    Ok(())
}

fn key_status(profile: &ProviderProfile, env: &RawEnvironment) -> String {
    let Some(secret) = profile.primary_secret() else {
        return "no key required".dim().to_string();
    };
    match env.get(secret) {
        Some(key) if providers::validate_api_key(profile.provider, key) => {
            format!("{} set", secret).green().to_string()
        }
        Some(_) => format!("{} malformed", secret).yellow().to_string(),
        None => format!("{} missing", secret).dim().to_string(),
    }
}
