mod cli;
mod commands;
mod settings;
mod terminal;

use std::process::ExitCode;

use learna_common::ConfigError;
use learna_config::LearnaConfig;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "learna=info";

fn load_config(args: &cli::Args) -> Result<LearnaConfig, ConfigError> {
    match args.config {
        Some(ref path) => learna_config::load_config_from(path),
        None => learna_config::load_config(),
    }
}

/// `--log-level` wins over the config file. A bare level such as `debug`
/// is scoped to the learna crates; anything else is used as a full
/// filter directive.
fn log_directive(cli_level: Option<&str>, config: Option<&LearnaConfig>) -> String {
    match cli_level {
        Some(level) if !level.contains('=') && !level.contains(',') => format!("learna={level}"),
        Some(directive) => directive.to_string(),
        None => config
            .map(|c| c.logging.level.directive())
            .unwrap_or(DEFAULT_DIRECTIVE)
            .to_string(),
    }
}

fn init_logging(directive: &str) {
    let directive = directive
        .parse::<Directive>()
        .or_else(|_| DEFAULT_DIRECTIVE.parse::<Directive>());
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = directive {
        filter = filter.add_directive(directive);
    }
    // Logs go to stderr so streamed replies on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let loaded = load_config(&args);
    init_logging(&log_directive(args.log_level.as_deref(), loaded.as_ref().ok()));
    tracing::debug!("learna v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("using config override: {}", path.display());
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("config load failed, using defaults: {e}");
        LearnaConfig::default()
    });

    match commands::run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("learna: {e}");
            ExitCode::FAILURE
        }
    }
}
