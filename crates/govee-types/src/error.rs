//! Error types for frame coding and value validation in govee-types.

use thiserror::Error;

/// Errors produced while encoding or decoding wire frames.
///
/// Inbound frames that fail to decode are dropped by the session; only
/// [`FrameError::TooLong`] and [`FrameError::TransferTooLong`] ever reach a
/// caller, since they are raised while building outbound traffic.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// Payload does not fit into a single frame.
    #[error("Command too long: {len} bytes (max {max})")]
    TooLong {
        /// Length of the rejected payload.
        len: usize,
        /// Largest accepted payload length.
        max: usize,
    },

    /// XOR over the whole frame was not zero.
    #[error("Checksum error: frame XORs to 0x{residue:02x}")]
    Checksum {
        /// Value of the XOR over all bytes (0 for a valid frame).
        residue: u8,
    },

    /// Leading byte is not one of the known command bytes.
    #[error("Unexpected frame: leading byte 0x{0:02x}")]
    UnexpectedFrame(u8),

    /// Frame has the wrong length or too few significant bytes.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// Multi-part payload needs more chunks than the count byte can describe.
    #[error("Multi-part payload too long: {len} bytes")]
    TransferTooLong {
        /// Length of the rejected payload.
        len: usize,
    },
}

/// A caller-supplied value outside its accepted range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name} must be {min}-{max}, got {value}")]
pub struct RangeError {
    /// Human-readable name of the rejected quantity.
    pub name: &'static str,
    /// The rejected value, rendered for display.
    pub value: String,
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl RangeError {
    /// Build a range error for `name`.
    pub fn new(name: &'static str, value: impl ToString, min: f64, max: f64) -> Self {
        Self {
            name,
            value: value.to_string(),
            min,
            max,
        }
    }
}

/// Result type alias for frame coding.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
