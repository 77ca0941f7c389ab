//! Wire protocol types for Govee BLE lights.
//!
//! This crate holds everything about the register protocol that does not need
//! a Bluetooth stack: register addresses and keys, the 20-byte frame codec,
//! multi-part write splitting, and the lighting value types.
//!
//! # Example
//!
//! ```
//! use govee_types::{Command, Frame, Register, RegisterKey, encode};
//!
//! let frame = encode(Command::Read, &[0x04, 0x25]).unwrap();
//! let decoded = Frame::decode(&frame).unwrap();
//! assert_eq!(decoded.key, RegisterKey::read(Register::DIMMER));
//! assert_eq!(&decoded.value[..], &[0x25]);
//! ```

pub mod chunk;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod types;
pub mod uuid;

pub use error::{FrameError, FrameResult, RangeError};
pub use frame::{FRAME_LEN, Frame, RawFrame, checksum, encode, encode_raw, encode_request};
pub use protocol::{Command, MULTI_ACK, Register, RegisterKey};
pub use types::{
    Argb, Mode, Rgb, SegmentMask, fraction_to_percent, model_from_name, percent_to_fraction,
};
pub use uuid as uuids;
