//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default light name or address
    #[serde(default)]
    pub device: Option<String>,

    /// Directory holding `<model>.json` scene catalogs
    #[serde(default)]
    pub scene_dir: Option<PathBuf>,

    /// Connection timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// How long a single console or bridge command may take, in seconds
    #[serde(default)]
    pub command_timeout: Option<u64>,

    /// MQTT bridge settings
    #[serde(default)]
    pub mqtt: MqttConfig,
}

/// MQTT bridge configuration.
///
/// ```toml
/// [mqtt]
/// broker = "mqtt://localhost:1883"
/// topic = "govee"
/// ```
///
/// Commands arrive on `{command}/{topic}/<name>` and results are published
/// to `{stat}/{topic}/{result}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker URL, `mqtt://host[:port]` or `mqtts://host[:port]`
    #[serde(default = "default_broker")]
    pub broker: String,

    /// Device topic segment
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Command topic prefix
    #[serde(default = "default_command")]
    pub command: String,

    /// Status topic prefix
    #[serde(default = "default_stat")]
    pub stat: String,

    /// Last topic segment of published results
    #[serde(default = "default_result")]
    pub result: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,

    /// QoS for subscriptions and results (0, 1 or 2)
    #[serde(default)]
    pub qos: u8,
}

fn default_broker() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_topic() -> String {
    "govee".to_string()
}

fn default_command() -> String {
    "cmnd".to_string()
}

fn default_stat() -> String {
    "stat".to_string()
}

fn default_result() -> String {
    "RESULT".to_string()
}

fn default_client_id() -> String {
    "govee-bridge".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            topic: default_topic(),
            command: default_command(),
            stat: default_stat(),
            result: default_result(),
            client_id: default_client_id(),
            username: None,
            password: None,
            keep_alive: default_keep_alive(),
            qos: 0,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("govee")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, or return default if missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }
}

/// Resolve device from arg, env var, or config.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device.or_else(|| config.device.clone())
}

/// Resolve a timeout: an explicit value wins over config, which wins over the
/// default.
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_device_prefers_arg() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        let result = resolve_device(Some("arg-device".to_string()), &config);
        assert_eq!(result, Some("arg-device".to_string()));
    }

    #[test]
    fn test_resolve_device_falls_back_to_config() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_device(None, &config), Some("config-device".to_string()));
    }

    #[test]
    fn test_resolve_device_none_when_both_empty() {
        assert_eq!(resolve_device(None, &Config::default()), None);
    }

    #[test]
    fn test_resolve_timeout() {
        let config = Config {
            timeout: Some(60),
            ..Default::default()
        };
        assert_eq!(resolve_timeout(45, &config, 30), 45);
        assert_eq!(resolve_timeout(30, &config, 30), 60);
        assert_eq!(resolve_timeout(30, &Config::default(), 30), 30);
    }

    #[test]
    fn test_mqtt_defaults_fill_partial_section() {
        let config: Config = toml::from_str(
            r#"
            device = "Govee_H6199_1A2B"

            [mqtt]
            broker = "mqtts://broker.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.device.as_deref(), Some("Govee_H6199_1A2B"));
        assert_eq!(config.mqtt.broker, "mqtts://broker.example.com");
        assert_eq!(config.mqtt.topic, "govee");
        assert_eq!(config.mqtt.command, "cmnd");
        assert_eq!(config.mqtt.result, "RESULT");
        assert_eq!(config.mqtt.keep_alive, 30);
    }

    #[test]
    fn test_serialized_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            device: Some("a4:c1:38:00:11:22".to_string()),
            scene_dir: Some(PathBuf::from("/srv/scenes")),
            command_timeout: Some(5),
            ..Default::default()
        };
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.device, config.device);
        assert_eq!(loaded.scene_dir, config.scene_dir);
        assert_eq!(loaded.command_timeout, Some(5));
        assert_eq!(loaded.mqtt.client_id, "govee-bridge");
    }

    #[test]
    fn test_load_invalid_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "device = [").unwrap();
        assert!(Config::load_from(&path).device.is_none());
    }
}
