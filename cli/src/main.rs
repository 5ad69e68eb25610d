mod commands;

use agentcfg_config::{ErrorFormatter, Settings};
use anyhow::Result;
use clap::Parser;
use commands::{
    handle_generate, handle_optimize, handle_presets, handle_providers, handle_validate, Cli,
    Commands,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !atty::is(atty::Stream::Stdout) || std::env::var_os("NO_COLOR").is_some() {
        yansi::disable();
    }

    let loaded = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", ErrorFormatter::new(err).format());
            std::process::exit(2);
        }
    };

    init_tracing(cli.log_level.as_deref(), &settings);

    match cli.command {
        Commands::Generate(args) => handle_generate(&settings, args).await?,
        Commands::Validate(args) => handle_validate(&settings, args).await?,
        Commands::Optimize(args) => handle_optimize(&settings, args).await?,
        Commands::Providers => handle_providers()?,
        Commands::Presets => handle_presets()?,
    }

    Ok(())
}

/// `--log-level` wins over `RUST_LOG`, which wins over the settings file
fn init_tracing(cli_level: Option<&str>, settings: &Settings) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
