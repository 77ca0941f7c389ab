//! Error types for govee-core.
//!
//! Errors fall into three groups:
//!
//! | Group | Variants | Raised |
//! |-------|----------|--------|
//! | Transport | [`Error::Bluetooth`], [`Error::NotConnected`], [`Error::DeviceNotFound`], [`Error::CharacteristicNotFound`], [`Error::Timeout`] | while connecting or writing, or when the session closes under a waiting call |
//! | Protocol | [`Error::Frame`], [`Error::Superseded`], [`Error::InvalidData`] | while building a request or when a reply never arrives in order |
//! | Caller | [`Error::InvalidRange`], [`Error::UnknownMode`], [`Error::UnknownScene`] | synchronously, before anything is sent |
//!
//! Malformed inbound frames never surface here: the session drops them and
//! reports them as [`LightEvent`](crate::events::LightEvent)s instead.
//!
//! Nothing is retried automatically. A [`Error::Superseded`] request can simply
//! be issued again; a [`Error::NotConnected`] session must be reopened.

use std::time::Duration;

use thiserror::Error;

use govee_types::{FrameError, RangeError, RegisterKey};

/// Errors that can occur when talking to a Govee light.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Operation attempted on a closed session, or the session closed while
    /// the operation was waiting for its reply.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// A request could not be encoded.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A value supplied by the caller is out of range.
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    /// A reply for a later request arrived first; this request's reply was
    /// never seen.
    #[error("Request {key} superseded by a later reply")]
    Superseded {
        /// Key of the abandoned request.
        key: RegisterKey,
    },

    /// The mode register holds a mode this library cannot decode.
    #[error("Unknown mode: 0x{0:02x}")]
    UnknownMode(u8),

    /// No scene matches the query.
    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    /// A reply could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(identifier.into())
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Result type alias using govee-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use govee_types::Register;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("Govee_H6199_1A2B");
        assert!(err.to_string().contains("Govee_H6199_1A2B"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("2b10", 3);
        assert!(err.to_string().contains("3 services"));

        let err = Error::timeout("heartbeat", Duration::from_secs(2));
        assert!(err.to_string().contains("heartbeat"));
        assert!(err.to_string().contains("2s"));
    }

    #[test]
    fn test_superseded_names_key() {
        let err = Error::Superseded {
            key: RegisterKey::read(Register::POWER),
        };
        assert!(err.to_string().contains("aa01"));
    }

    #[test]
    fn test_unknown_mode_display() {
        assert_eq!(Error::UnknownMode(0x13).to_string(), "Unknown mode: 0x13");
    }

    #[test]
    fn test_range_error_is_transparent() {
        let err: Error = RangeError::new("Dimmer", 1.5, 0.0, 1.0).into();
        assert!(matches!(err, Error::InvalidRange(_)));
        assert_eq!(err.to_string(), "Dimmer must be 0-1, got 1.5");
    }

    #[test]
    fn test_frame_error_conversion() {
        let err: Error = FrameError::TooLong { len: 19, max: 18 }.into();
        assert!(matches!(err, Error::Frame(FrameError::TooLong { .. })));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
