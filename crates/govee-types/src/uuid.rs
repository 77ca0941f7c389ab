//! Bluetooth UUIDs for Govee lights.
//!
//! The register protocol runs over a single vendor service with one
//! characteristic for each direction.

use uuid::{Uuid, uuid};

/// Vendor service carrying the register protocol.
pub const REGISTER_SERVICE: Uuid = uuid!("00010203-0405-0607-0809-0a0b0c0d1910");

/// Notify characteristic: every reply and unsolicited report arrives here.
pub const RECV_CHARACTERISTIC: Uuid = uuid!("00010203-0405-0607-0809-0a0b0c0d2b10");

/// Write characteristic: every outbound frame is written here.
pub const SEND_CHARACTERISTIC: Uuid = uuid!("00010203-0405-0607-0809-0a0b0c0d2b11");

// --- Standard BLE Service UUIDs ---

/// Generic Attribute service ("service changed" lives here).
pub const GATT_SERVICE: Uuid = uuid!("00001801-0000-1000-8000-00805f9b34fb");

/// Service changed characteristic.
pub const SERVICE_CHANGED: Uuid = uuid!("00002a05-0000-1000-8000-00805f9b34fb");
