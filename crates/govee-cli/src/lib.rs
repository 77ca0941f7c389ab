//! Command-line tools for Govee BLE lights.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan for nearby lights |
//! | `status` | Print a light's power, dimmer, mode, versions and MAC |
//! | `console` | Interactive text console |
//! | `bridge` | Serve text commands over MQTT |
//! | `scenes` | Print the scene catalog of a model |
//! | `consolidate` | Convert vendor scene dumps into catalog files |
//!
//! The console and the bridge share one command language; see [`dispatch`].
//!
//! # Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! (`~/.config/govee/config.toml` on Linux):
//!
//! ```toml
//! device = "Govee_H6199_1A2B"
//! scene_dir = "/usr/share/govee/scenes"
//! command_timeout = 10
//!
//! [mqtt]
//! broker = "mqtt://localhost:1883"
//! topic = "govee"
//! ```
//!
//! The device may also be given with `--device` or `GOVEE_DEVICE`.

pub mod asm;
pub mod color;
pub mod config;
pub mod consolidate;
pub mod dispatch;

pub use config::Config;
pub use dispatch::handle_command;
