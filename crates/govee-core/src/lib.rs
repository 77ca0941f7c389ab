//! BLE session library for Govee lights.
//!
//! Govee H6xxx lights expose a register-based protocol over a single GATT
//! service: every request is a 20-byte frame written to one characteristic,
//! and every reply arrives as a notification on another. Replies carry no
//! request id, so this crate matches them to requests by order.
//!
//! # Features
//!
//! - **Discovery**: scan for lights by their advertised `Govee_Hxxxx_xxxx` name
//! - **Sessions**: request/reply correlation, heartbeat, event stream
//! - **Lighting**: power, dimmer, per-segment color and brightness
//! - **Scenes**: built-in scene ids and per-model scene catalogs
//! - **Testing**: an in-memory [`MockTransport`] that behaves like a light
//!
//! # Quick Start
//!
//! ```no_run
//! use govee_core::{Light, Rgb, SegmentMask, scan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lights = scan::scan_for_lights().await?;
//!     println!("Found {} lights", lights.len());
//!
//!     let light = Light::connect("Govee_H6199").await?;
//!     light.set_power(true).await?;
//!     light.set_color(Rgb::new(255, 80, 0), SegmentMask::ALL).await?;
//!     println!("Mode: {}", light.get_mode().await?);
//!
//!     light.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod correlator;
pub mod device;
pub mod error;
pub mod events;
pub mod mock;
pub mod mode;
pub mod scan;
pub mod scenes;
pub mod transport;
pub mod util;

pub use govee_types::types;

pub use device::{ConnectionConfig, Light};
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, LightEvent};
pub use mock::MockTransport;
pub use scan::{DiscoveredLight, ScanOptions};
pub use scenes::{Scene, SceneCatalog, SceneQuery};
pub use transport::{BleTransport, Inbound, LightTransport};
pub use util::{create_identifier, format_peripheral_id};

/// A light shared across tasks.
///
/// `Light` is not `Clone`: it owns the link and its tasks. Wrap it in `Arc`
/// to use it from several places.
///
/// ```no_run
/// use std::sync::Arc;
/// use govee_core::{Light, SharedLight};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let light: SharedLight = Arc::new(Light::connect("Govee_H6199").await?);
/// let poller = Arc::clone(&light);
/// tokio::spawn(async move {
///     let _ = poller.get_power().await;
/// });
/// # Ok(())
/// # }
/// ```
pub type SharedLight = std::sync::Arc<Light>;

pub use govee_types::uuid as uuids;
pub use govee_types::{
    Argb, Command, Frame, FrameError, Mode, RangeError, Register, RegisterKey, Rgb, SegmentMask,
};
