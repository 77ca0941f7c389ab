//! Status command implementation.

use anyhow::{Context, Result};
use govee_cli::{Config, handle_command};
use serde_json::Value;

use crate::cli::DeviceArgs;
use crate::util::{command_timeout, connect_light};

pub async fn cmd_status(args: &DeviceArgs, config: &Config) -> Result<()> {
    let light = connect_light(args, config).await?;

    let status = handle_command(&light, "status", "", command_timeout(config)).await;
    light.disconnect().await.context("Failed to disconnect")?;

    if let Some(Value::String(error)) = status.get("ERROR") {
        anyhow::bail!("Failed to read status: {}", error);
    }
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
