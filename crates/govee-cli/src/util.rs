//! Utility functions for CLI operations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use govee_cli::Config;
use govee_cli::config::{resolve_device, resolve_timeout};
use govee_cli::dispatch::DEFAULT_COMMAND_TIMEOUT;
use govee_core::{ConnectionConfig, Light};
use tracing::info;

use crate::cli::DeviceArgs;

/// Default connection timeout in seconds, matching the clap default.
const DEFAULT_TIMEOUT: u64 = 30;

/// Get device identifier, with helpful error message.
pub fn require_device(device: Option<String>) -> Result<String> {
    device.ok_or_else(|| {
        anyhow::anyhow!(
            "No device specified. Use --device <NAME|ADDRESS> or set GOVEE_DEVICE environment variable.\n\
             Run 'govee scan' to find nearby lights."
        )
    })
}

/// Scene directory from the command line, then config, then `./scenes`.
pub fn scene_dir(arg: Option<PathBuf>, config: &Config) -> PathBuf {
    arg.or_else(|| config.scene_dir.clone())
        .unwrap_or_else(|| PathBuf::from("scenes"))
}

/// Time a single text command may take.
pub fn command_timeout(config: &Config) -> Duration {
    config
        .command_timeout
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT)
}

/// Connect to the light selected by `args` and `config`.
pub async fn connect_light(args: &DeviceArgs, config: &Config) -> Result<Light> {
    let identifier = require_device(resolve_device(args.device.clone(), config))?;
    let timeout = resolve_timeout(args.timeout, config, DEFAULT_TIMEOUT);

    let connection = ConnectionConfig::default()
        .connection_timeout(Duration::from_secs(timeout))
        .scene_dir(scene_dir(args.scene_dir.clone(), config));

    info!("Connecting to {}...", identifier);
    let light = Light::connect_with_config(&identifier, connection)
        .await
        .with_context(|| format!("Failed to connect to {}", identifier))?;
    info!("Connected to {} ({})", light.name(), light.address());
    Ok(light)
}
