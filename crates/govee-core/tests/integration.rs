//! Hardware tests for govee-core
//!
//! These tests need a real light in range and should be run with:
//! `cargo test --package govee-core --test integration -- --ignored --nocapture`
//!
//! Set GOVEE_DEVICE to the light's address or name:
//! `GOVEE_DEVICE="Govee_H6199_1A2B" cargo test --package govee-core --test integration -- --ignored`

use std::env;
use std::time::Duration;

use govee_core::scan::{ScanOptions, scan_with_options};
use govee_core::{ConnectionConfig, Light, Rgb, SegmentMask};
use tokio::time::timeout;

/// Default timeout for BLE operations.
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

fn get_device_name() -> String {
    env::var("GOVEE_DEVICE").unwrap_or_else(|_| "Govee_H".to_string())
}

async fn connect() -> Light {
    let config = ConnectionConfig::default().scene_dir("../../scenes");
    timeout(BLE_TIMEOUT, Light::connect_with_config(&get_device_name(), config))
        .await
        .expect("connect timed out")
        .expect("connect failed")
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_for_lights() {
    let options = ScanOptions::default().duration_secs(10);
    let result = timeout(BLE_TIMEOUT, scan_with_options(options)).await;

    match result {
        Ok(Ok(lights)) => {
            println!("Found {} lights", lights.len());
            for light in lights {
                println!(
                    "  {} ({}) model {:?}",
                    light.name.as_deref().unwrap_or("Unknown"),
                    light.identifier,
                    light.model
                );
            }
        }
        Ok(Err(e)) => panic!("Scan failed: {}", e),
        Err(_) => panic!("Scan timed out after {:?}", BLE_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_device_info() {
    let light = connect().await;

    let version = timeout(BLE_TIMEOUT, light.get_version()).await;
    println!("Version: {:?}", version);
    let mac = timeout(BLE_TIMEOUT, light.get_mac()).await;
    println!("MAC: {:?}", mac);
    let mode = timeout(BLE_TIMEOUT, light.get_mode()).await;
    println!("Mode: {:?}", mode);

    light.disconnect().await.expect("disconnect failed");
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_color_and_dimmer() {
    let light = connect().await;

    timeout(BLE_TIMEOUT, light.set_power(true))
        .await
        .expect("timed out")
        .expect("set_power failed");
    timeout(BLE_TIMEOUT, light.set_color(Rgb::new(255, 0, 0), SegmentMask::ALL))
        .await
        .expect("timed out")
        .expect("set_color failed");
    timeout(BLE_TIMEOUT, light.set_dimmer(0.5))
        .await
        .expect("timed out")
        .expect("set_dimmer failed");

    let dimmer = timeout(BLE_TIMEOUT, light.read(govee_core::Register::DIMMER))
        .await
        .expect("timed out")
        .expect("read failed");
    assert_eq!(&dimmer[..], &[50]);

    light.disconnect().await.expect("disconnect failed");
}
