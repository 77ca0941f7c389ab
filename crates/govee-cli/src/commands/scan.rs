//! Scan command implementation.

use anyhow::{Context, Result};
use govee_core::{ScanOptions, scan};

pub async fn cmd_scan(timeout: u64, all: bool, quiet: bool) -> Result<()> {
    let mut options = ScanOptions::default().duration_secs(timeout);
    if all {
        options = options.all_devices();
    }

    let lights = scan::scan_with_options(options)
        .await
        .context("Failed to scan for devices")?;

    if lights.is_empty() {
        if !quiet {
            eprintln!("No lights found. Make sure the light is powered on and in range.");
        }
        return Ok(());
    }

    for light in &lights {
        let name = light.name.as_deref().unwrap_or("Unknown");
        let model = light.model.as_deref().unwrap_or("-");
        let rssi = light
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<24} {:<6} {:<20} {}", name, model, light.identifier, rssi);
    }

    if !quiet {
        eprintln!("\nFound {} light(s)", lights.len());
    }
    Ok(())
}
