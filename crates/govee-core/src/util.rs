//! Identifier formatting helpers.

use btleplug::platform::PeripheralId;

/// Address reported by platforms that hide the real one (macOS).
pub const UNSET_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a plain string, without the `PeripheralId(..)`
/// wrapper of its `Debug` output.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Identifier to connect by: the address, or the peripheral ID where the
/// platform hides addresses.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == UNSET_ADDRESS {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Format MAC bytes as colon-separated lowercase hex, in the order given.
#[must_use]
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Compare two addresses ignoring case and colons.
#[must_use]
pub fn same_address(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.replace(':', "").to_lowercase();
    strip(a) == strip(b)
}
