//! Fatigue-Monitoring Mirror - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use mirrord::{app, config, init_logging, selftest};

#[derive(Parser)]
#[command(name = "mirrord", version, about = "Fatigue-monitoring mirror appliance")]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Normal monitoring run (default)
    Run,
    /// Cycle the LED patterns and exit
    TestHardware,
    /// Play the fixed test phrases and exit
    TestAudio,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    info!("=== Fatigue Mirror v{} ===", env!("CARGO_PKG_VERSION"));

    let cfg = config::load(cli.config.as_deref()).context("loading configuration")?;

    let code = match cli.mode.unwrap_or(Mode::Run) {
        Mode::Run => app::run(cfg).await,
        Mode::TestHardware => selftest::run_hardware_test(&cfg.led).await,
        Mode::TestAudio => selftest::run_audio_test().await,
    };

    std::process::exit(code);
}
