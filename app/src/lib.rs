//! Loopwise command-line application library

pub mod report;
pub mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use loopwise_core::AppConfig;
use tracing_subscriber::EnvFilter;

/// Price and plan a looping strategy from a market snapshot
#[derive(Debug, Parser)]
#[command(name = "loopwise", version, about)]
pub struct Cli {
    /// Scenario file (strategy, market snapshot, simulation request)
    pub scenario: PathBuf,

    /// Config file; defaults apply when absent
    #[arg(long, default_value = "loopwise.json")]
    pub config: PathBuf,

    /// Print the report without indentation
    #[arg(long)]
    pub compact: bool,
}

/// Log filter from `rust_log` when set, otherwise from the configured
/// `log_filter` directives
fn env_filter(rust_log: Option<&str>, config: &AppConfig) -> anyhow::Result<EnvFilter> {
    let directives = rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(&config.log_filter);
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter {directives:?}"))
}

/// Install the tracing subscriber on stderr
fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(rust_log.as_deref(), config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Run the application
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    init_tracing(&config)?;

    tracing::info!(scenario = %cli.scenario.display(), "Starting Loopwise");

    let scenario = scenario::Scenario::from_file(&cli.scenario)?;
    let report = scenario::evaluate(&scenario, &config.looping)
        .with_context(|| format!("evaluating strategy {}", scenario.strategy.id))?;

    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");
    Ok(())
}
