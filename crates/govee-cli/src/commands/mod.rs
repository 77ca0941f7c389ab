//! Command implementations for the CLI.

#[cfg(feature = "mqtt")]
mod bridge;
mod console;
mod consolidate;
mod scan;
mod scenes;
mod status;

#[cfg(feature = "mqtt")]
pub use bridge::cmd_bridge;
pub use console::cmd_console;
pub use consolidate::cmd_consolidate;
pub use scan::cmd_scan;
pub use scenes::cmd_scenes;
pub use status::cmd_status;
