//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Light name or address, or use GOVEE_DEVICE env var
    #[arg(short, long, env = "GOVEE_DEVICE")]
    pub device: Option<String>,

    /// Connection timeout in seconds
    #[arg(short = 'T', long, default_value = "30")]
    pub timeout: u64,

    /// Directory holding `<model>.json` scene catalogs
    #[arg(long)]
    pub scene_dir: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(name = "govee")]
#[command(author, version, about = "Tools for Govee BLE lights", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan for nearby lights
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,

        /// Include devices that are not Govee lights
        #[arg(short, long)]
        all: bool,
    },

    /// Print the state of a light as JSON
    Status {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Interactive console for text commands
    Console {
        #[command(flatten)]
        device: DeviceArgs,

        /// Print every frame sent and received
        #[arg(short, long)]
        events: bool,
    },

    /// Serve text commands over MQTT
    #[cfg(feature = "mqtt")]
    Bridge {
        #[command(flatten)]
        device: DeviceArgs,

        /// Broker URL (overrides config)
        #[arg(short, long)]
        broker: Option<String>,

        /// Device topic (overrides config)
        #[arg(long)]
        topic: Option<String>,
    },

    /// Print the scene catalog of a model as JSON
    Scenes {
        /// Model, e.g. H6199
        model: String,

        /// Directory holding `<model>.json` scene catalogs
        #[arg(long)]
        scene_dir: Option<PathBuf>,
    },

    /// Convert vendor scene dumps (`<model>.json`) into catalog files
    Consolidate {
        /// Directory of vendor dumps
        input: PathBuf,

        /// Output directory for catalog files
        #[arg(short, long, default_value = "scenes")]
        output: PathBuf,
    },
}
