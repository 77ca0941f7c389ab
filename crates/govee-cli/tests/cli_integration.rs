//! CLI Integration Tests
//!
//! These run the `govee` binary. Tests that talk to a light are marked
//! with #[ignore].
//!
//! Run offline tests:
//! ```
//! cargo test --package govee-cli --test cli_integration
//! ```
//!
//! Run hardware tests:
//! ```
//! GOVEE_DEVICE="Govee_H6199_1A2B" cargo test --package govee-cli --test cli_integration -- --ignored --nocapture
//! ```

use std::env;
use std::fs;
use std::process::Command;

fn get_binary_path() -> String {
    let release_path = env!("CARGO_MANIFEST_DIR").to_string() + "/../../target/release/govee";
    let debug_path = env!("CARGO_MANIFEST_DIR").to_string() + "/../../target/debug/govee";

    if std::path::Path::new(&release_path).exists() {
        release_path
    } else if std::path::Path::new(&debug_path).exists() {
        debug_path
    } else {
        "cargo".to_string()
    }
}

fn run_govee(args: &[&str]) -> std::process::Output {
    let binary = get_binary_path();

    if binary == "cargo" {
        Command::new("cargo")
            .args(["run", "--package", "govee-cli", "--"])
            .args(args)
            .output()
            .expect("Failed to run govee via cargo")
    } else {
        Command::new(&binary)
            .args(args)
            .output()
            .expect("Failed to run govee binary")
    }
}

fn get_device() -> Option<String> {
    env::var("GOVEE_DEVICE").ok().filter(|s| !s.is_empty())
}

// =============================================================================
// Help and Version
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_govee(&["--help"]);
    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Govee"), "Help should mention Govee");
    for cmd in ["scan", "status", "console", "scenes", "consolidate"] {
        assert!(stdout.contains(cmd), "Help should list {} command", cmd);
    }
}

#[test]
fn test_version_command() {
    let output = run_govee(&["--version"]);
    assert!(output.status.success(), "Version should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("govee"), "Version should contain govee");
}

#[test]
fn test_subcommand_help() {
    for cmd in ["scan", "status", "console", "scenes", "consolidate"] {
        let output = run_govee(&[cmd, "--help"]);
        assert!(output.status.success(), "{} --help should succeed", cmd);
        assert!(!output.stdout.is_empty(), "{} --help should produce output", cmd);
    }
}

#[test]
fn test_unknown_subcommand_fails() {
    let output = run_govee(&["frobnicate"]);
    assert!(!output.status.success());
}

// =============================================================================
// Scene catalogs (no hardware required)
// =============================================================================

#[test]
fn test_consolidate_then_list_scenes() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::write(
        input.path().join("H6199.json"),
        r#"{ "data": { "categories": [
            { "categoryName": "Natural", "scenes": [
                { "sceneName": "Sunrise", "lightEffects": [{ "sceneCode": 10191, "scenceParam": "AQID" }] },
                { "sceneName": "Sunset", "lightEffects": [{ "sceneCode": 10192, "scenceParam": "" }] }
            ] }
        ] } }"#,
    )
    .unwrap();

    let out_dir = output.path().to_str().unwrap();
    let result = run_govee(&[
        "-q",
        "consolidate",
        input.path().to_str().unwrap(),
        "-o",
        out_dir,
    ]);
    assert!(
        result.status.success(),
        "consolidate failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert!(output.path().join("H6199.json").exists());

    let result = run_govee(&["scenes", "h6199", "--scene-dir", out_dir]);
    assert!(result.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(
        summary,
        serde_json::json!({ "Natural": { "Sunrise": 10191, "Sunset": 10192 } })
    );
}

#[test]
fn test_scenes_missing_catalog_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_govee(&["scenes", "H0000", "--scene-dir", dir.path().to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No scenes for H0000"), "stderr: {}", stderr);
}

// =============================================================================
// Hardware
// =============================================================================

#[test]
#[ignore = "requires BLE hardware"]
fn test_status_with_device() {
    let Some(device) = get_device() else {
        eprintln!("GOVEE_DEVICE not set, skipping");
        return;
    };

    let output = run_govee(&["status", "-d", &device]);
    assert!(
        output.status.success(),
        "status failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(status.get("Power").is_some());
    assert!(status.get("MAC").is_some());
}

#[test]
#[ignore = "requires BLE hardware"]
fn test_scan_finds_lights() {
    let output = run_govee(&["scan", "-t", "10"]);
    assert!(output.status.success());
}
