// rolegate - main.rs
// Loads configuration, installs logging and hands off to the CLI dispatcher.

use clap::Parser;
use std::process::exit;
use tracing::Level;

use rolegate::cli::{dispatch, Cli};
use rolegate::config::GateConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match GateConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            exit(1);
        }
    };

    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    if let Err(e) = dispatch(cli, config).await {
        tracing::error!("{e:#}");
        exit(1);
    }
}
