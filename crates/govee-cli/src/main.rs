use anyhow::Result;
use clap::Parser;
use govee_cli::Config;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod util;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet wins over verbose; otherwise RUST_LOG, then info
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    match cli.command {
        Commands::Scan { timeout, all } => commands::cmd_scan(timeout, all, cli.quiet).await,
        Commands::Status { device } => commands::cmd_status(&device, &config).await,
        Commands::Console { device, events } => {
            commands::cmd_console(&device, events, &config).await
        }
        #[cfg(feature = "mqtt")]
        Commands::Bridge {
            device,
            broker,
            topic,
        } => commands::cmd_bridge(&device, broker, topic, &config).await,
        Commands::Scenes { model, scene_dir } => commands::cmd_scenes(&model, scene_dir, &config),
        Commands::Consolidate { input, output } => {
            commands::cmd_consolidate(&input, &output, cli.quiet)
        }
    }
}
