//! Text command dispatch against the mock light.
//!
//! Run with: `cargo test --package govee-cli --test dispatch`

use std::sync::Arc;
use std::time::Duration;

use govee_cli::handle_command;
use govee_core::{ConnectionConfig, Light, MockTransport, Register, RegisterKey, SceneCatalog};
use govee_types::encode_raw;
use serde_json::{Value, json};

const NAME: &str = "Govee_H6199_1A2B";
const LIMIT: Duration = Duration::from_secs(2);

fn open() -> (Arc<MockTransport>, Light) {
    let (mock, inbound) = MockTransport::new();
    let config = ConnectionConfig::default().heartbeat_interval(None);
    let light = Light::from_transport(mock.clone(), inbound, NAME, "MOCK", config);
    (mock, light)
}

async fn run(light: &Light, command: &str, data: &str) -> Value {
    handle_command(light, command, data, LIMIT).await
}

fn is_error(value: &Value) -> bool {
    value.get("ERROR").is_some()
}

#[tokio::test]
async fn test_power() {
    let (mock, light) = open();

    assert_eq!(run(&light, "power", "").await, json!({ "Power": true }));
    assert_eq!(run(&light, "power", "off").await, json!({ "Power": false }));
    assert_eq!(run(&light, "Power", "toggle").await, json!({ "Power": true }));
    assert_eq!(mock.register(Register::POWER), Some(vec![1]));

    assert_eq!(
        run(&light, "power", "maybe").await,
        json!({ "ERROR": "Invalid power value: maybe" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_dimmer_accepts_fraction_and_percent() {
    let (mock, light) = open();

    assert_eq!(run(&light, "dimmer", "0.37").await, json!({ "Dimmer": 0.37 }));
    assert_eq!(mock.register(Register::DIMMER), Some(vec![37]));

    assert_eq!(run(&light, "dimmer", "80").await, json!({ "Dimmer": 0.8 }));
    assert_eq!(mock.register(Register::DIMMER), Some(vec![80]));

    assert_eq!(
        run(&light, "dimmer", "abc").await,
        json!({ "ERROR": "Invalid dimmer value: abc" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_dimmer_out_of_range_sends_nothing() {
    let (mock, light) = open();

    let result = run(&light, "dimmer", "150").await;
    assert!(is_error(&result), "{}", result);
    assert_eq!(mock.write_count(), 0);

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_color_and_mode() {
    let (_mock, light) = open();

    assert_eq!(
        run(&light, "color", "#ff8000").await,
        json!({ "Color": "#FF8000" })
    );
    assert_eq!(
        run(&light, "mode", "").await,
        json!({ "Mode": { "mode": "color", "brightness": 1.0, "color": "#FF8000" } })
    );
    assert_eq!(run(&light, "color", "").await, json!({ "Color": "#FF8000" }));

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_segment_color() {
    let (_mock, light) = open();

    assert_eq!(run(&light, "color3", "blue").await, json!({ "Color": "#0000FF" }));
    assert_eq!(run(&light, "color3", "").await, json!({ "Color": "#0000FF" }));

    let mode = run(&light, "mode", "").await;
    assert_eq!(mode["Mode"]["mode"], "segment");
    assert_eq!(mode["Mode"]["segments"][3]["color"], "#0000FF");
    assert_eq!(mode["Mode"]["segments"][0]["color"], "#FFFFFF");

    assert_eq!(
        run(&light, "color15", "red").await,
        json!({ "ERROR": "Invalid segment: 15" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_invalid_colors_send_nothing() {
    let (mock, light) = open();

    assert!(is_error(&run(&light, "color", "300,0,0").await));
    assert_eq!(
        run(&light, "color", "mauve").await,
        json!({ "ERROR": "Invalid color: \"mauve\"" })
    );
    assert_eq!(mock.write_count(), 0);

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_brightness() {
    let (mock, light) = open();

    assert_eq!(
        run(&light, "brightness", "50").await,
        json!({ "Brightness": 0.5 })
    );
    let frame = mock.written()[0];
    assert_eq!(&frame[..7], &[0x33, 0x05, 0x15, 0x02, 50, 0xFF, 0x7F]);

    assert_eq!(
        run(&light, "brightness", "").await,
        json!({ "Brightness": 0.5 })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_builtin_scene() {
    let (mock, light) = open();
    light.set_catalog(SceneCatalog::empty());

    assert_eq!(
        run(&light, "scene", "Movie").await,
        json!({ "Scene": { "name": "movie", "code": 4 } })
    );
    assert_eq!(mock.register(Register::MODE), Some(vec![0x04, 0x04]));

    assert_eq!(
        run(&light, "scene", "nonsense").await,
        json!({ "ERROR": "Invalid scene: nonsense" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_cataloged_scene() {
    let (mock, light) = open();
    let catalog = SceneCatalog::from_json(
        r#"{ "Natural": { "Sunrise": { "effects": [{ "code": 10191, "param": "AQID" }] } } }"#,
    )
    .unwrap();
    light.set_catalog(catalog);

    assert_eq!(
        run(&light, "scene", "0x27cf").await,
        json!({ "Scene": { "name": "Sunrise", "category": "Natural", "code": 10191 } })
    );
    assert_eq!(&mock.transfers()[0][..3], &[1, 2, 3]);

    assert_eq!(
        run(&light, "scenes", "").await,
        json!({ "Scenes": { "Natural": { "Sunrise": 10191 } } })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_device_info() {
    let (_mock, light) = open();

    assert_eq!(
        run(&light, "version", "").await,
        json!({ "Version": ["1.00.12", "3.01.01", "1.04.07"] })
    );
    assert_eq!(
        run(&light, "version2", "").await,
        json!({ "Version": "3.01.01" })
    );
    assert_eq!(
        run(&light, "mac", "").await,
        json!({ "MAC": "d3:39:32:35:1a:88" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_status() {
    let (_mock, light) = open();

    let status = run(&light, "status", "").await;
    assert_eq!(status["Power"], true);
    assert_eq!(status["Dimmer"], 1.0);
    assert_eq!(status["Mode"]["color"], "#FFFFFF");
    assert_eq!(status["MAC"], "d3:39:32:35:1a:88");
    assert_eq!(status["Restart"], 1);

    assert_eq!(
        run(&light, "status2", "").await,
        json!({ "ERROR": "Unknown command: status2" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_restart() {
    let (mock, light) = open();

    assert_eq!(run(&light, "restart", "2").await, json!({ "Restart": 1 }));
    assert_eq!(mock.restart_count(), 1);
    assert_eq!(
        run(&light, "restart", "300").await,
        json!({ "ERROR": "Invalid reason" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_peek_and_poke() {
    let (mock, light) = open();

    assert_eq!(run(&light, "peek", "05").await, json!({ "Peek": "15" }));
    assert_eq!(
        run(&light, "peek", "a500:a501").await,
        json!({ "Peek": ["64ffffff64ffffff64ffffff", "64ffffff64ffffff64ffffff"] })
    );
    assert_eq!(
        run(&light, "peek", "xx").await,
        json!({ "ERROR": "Invalid register" })
    );

    assert_eq!(run(&light, "poke", "04 32").await, json!({ "Poke": null }));
    assert_eq!(mock.register(Register::DIMMER), Some(vec![0x32]));
    assert_eq!(
        run(&light, "poke", "04").await,
        json!({ "ERROR": "Missing data" })
    );
    assert_eq!(
        run(&light, "poke", "04 xyz").await,
        json!({ "ERROR": "Invalid data" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_peek_range_reports_partial_results_on_timeout() {
    let (mock, inbound) = MockTransport::new();
    let config = ConnectionConfig::default().heartbeat_interval(None);
    let light = Light::from_transport(mock.clone(), inbound, NAME, "MOCK", config);
    mock.silence(RegisterKey::read(Register::new(0x02)));

    let result = handle_command(&light, "peek", "01:02", Duration::from_millis(200)).await;
    assert_eq!(result, json!({ "ERROR": "Timeout", "Peek": ["01"] }));

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_raw_multi_and_asm() {
    let (mock, light) = open();

    assert_eq!(run(&light, "raw", "aa01").await, json!({ "Raw": null }));
    assert_eq!(mock.written()[0], encode_raw(&[0xAA, 0x01]).unwrap());
    assert_eq!(
        run(&light, "raw", &"00".repeat(20)).await,
        json!({ "ERROR": "Invalid data" })
    );

    assert_eq!(run(&light, "multi", "01 02 03").await, json!({ "Multi": null }));
    assert_eq!(&mock.transfers()[0][..3], &[1, 2, 3]);

    let before = mock.written().len();
    assert_eq!(run(&light, "asm", "r/01,04").await, json!({ "ASM": null }));
    let written = mock.written();
    assert_eq!(written.len(), before + 2);
    assert_eq!(written[before], encode_raw(&[0xAA, 0x01]).unwrap());
    assert_eq!(written[before + 1], encode_raw(&[0xAA, 0x04]).unwrap());

    assert!(is_error(&run(&light, "asm", "a/b/c/d").await));

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_state_lists_cached_registers() {
    let (_mock, light) = open();

    run(&light, "power", "").await;
    run(&light, "dimmer", "").await;
    assert_eq!(
        run(&light, "state", "").await,
        json!({ "State": { "01": "01", "04": "64" } })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_unknown_and_invalid_commands() {
    let (_mock, light) = open();

    assert_eq!(
        run(&light, "frobnicate", "").await,
        json!({ "ERROR": "Unknown command: frobnicate" })
    );
    assert_eq!(
        run(&light, "42", "").await,
        json!({ "ERROR": "Invalid command: 42" })
    );

    light.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_disconnected_light_reports_error() {
    let (_mock, light) = open();
    light.disconnect().await.unwrap();

    let result = run(&light, "power", "on").await;
    assert!(is_error(&result), "{}", result);
}
