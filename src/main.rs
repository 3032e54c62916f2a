// Orion personal assistant
// Main entry point for the orion binary

use clap::Parser;
use orion::cli::{Cli, Command};
use orion::config::Config;
use orion::handlers::{handle_doctor, handle_run};
use orion::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pull TELEGRAM_TOKEN / GEMINI_API_KEY from a local .env if present.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Orion v{}", env!("CARGO_PKG_VERSION"));

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the CLI or config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    match cli.command {
        Command::Run => handle_run(&config).await,
        Command::Doctor => handle_doctor(&config).await,
    }
}
