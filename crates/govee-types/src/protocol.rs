//! Command bytes, register addresses, and keys of the register protocol.
//!
//! Every frame starts with a [`Command`] followed by a register address. Two
//! registers (info and the color buffer) are multi-registers: the byte after
//! the address selects a sub-register. A [`RegisterKey`] is the
//! (command, register) pair that correlates a reply with its request.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Leading byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Command {
    /// Read from a register.
    Read = 0xAA,
    /// Write to a register.
    Write = 0x33,
    /// Multi-part write.
    Multi = 0xA3,
}

impl Command {
    /// The wire byte of this command.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xAA => Ok(Command::Read),
            0x33 => Ok(Command::Write),
            0xA3 => Ok(Command::Multi),
            other => Err(FrameError::UnexpectedFrame(other)),
        }
    }
}

/// Power register. `0x01` is on, anything else is off.
pub const REG_POWER: u8 = 0x01;
/// Dimmer register, stored as a percentage.
pub const REG_DIMMER: u8 = 0x04;
/// Mode register; see [`MODE_SCENE`] and [`MODE_SEGMENT`].
pub const REG_MODE: u8 = 0x05;
/// Version string register.
pub const REG_VERSION: u8 = 0x06;
/// Information multi-register.
pub const REG_INFO: u8 = 0x07;
/// Restart register. Writing a reason code restarts the light.
pub const REG_RESTART: u8 = 0x0E;
/// Color buffer multi-register.
///
/// Each sub-register holds three 4-byte colors (brightness + rgb). Slots keep
/// garbage from earlier commands if not overwritten; `xx010101` marks an
/// undefined color.
pub const REG_BUFFER: u8 = 0xA5;

/// Registers with sub-registers.
pub const MULTI_REGISTERS: [u8; 2] = [REG_INFO, REG_BUFFER];

/// Info sub-register: MAC address (little-endian) plus two unknown bytes.
pub const INFO_MAC_UNKNOWN: u8 = 0x02;
/// Info sub-register: hardware version string.
pub const INFO_HW_VERSION: u8 = 0x03;
/// Info sub-register: firmware version string.
pub const INFO_FW_VERSION: u8 = 0x04;
/// Info sub-register: MAC address (little-endian).
pub const INFO_MAC: u8 = 0x06;

/// Mode register value for a scene.
pub const MODE_SCENE: u8 = 0x04;
/// Mode register value for segment colors.
pub const MODE_SEGMENT: u8 = 0x15;
/// Segment mode sub-command: set color.
pub const SEGMENT_SET_COLOR: u8 = 0x01;
/// Segment mode sub-command: set brightness.
pub const SEGMENT_SET_BRIGHTNESS: u8 = 0x02;

/// Number of independently colorable segments.
pub const SEGMENT_COUNT: usize = 15;
/// Color buffer slot of segment 0; the first slots are reserved by firmware.
pub const SEGMENT_SLOT_OFFSET: usize = 3;
/// Colors held by one color buffer sub-register.
pub const SLOTS_PER_SUBREGISTER: usize = 3;
/// Bytes per color slot (brightness, r, g, b).
pub const SLOT_LEN: usize = 4;

/// Wire value of a fully-on dimmer or brightness.
pub const MAX_PERCENT: u8 = 100;

/// Whether `address` is a multi-register.
#[must_use]
pub const fn is_multi_register(address: u8) -> bool {
    address == REG_INFO || address == REG_BUFFER
}

/// A register address, including the sub-register for multi-registers.
///
/// Multi-registers always carry a sub-register index (0 when unspecified), so
/// a key built locally compares equal to the key decoded from the reply even
/// when the device's trailing zero padding swallowed the sub-register byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Register {
    address: u8,
    sub: Option<u8>,
}

impl Register {
    pub const POWER: Register = Register::new(REG_POWER);
    pub const DIMMER: Register = Register::new(REG_DIMMER);
    pub const MODE: Register = Register::new(REG_MODE);
    pub const VERSION: Register = Register::new(REG_VERSION);
    pub const RESTART: Register = Register::new(REG_RESTART);
    pub const INFO_MAC_UNKNOWN: Register = Register::indexed(REG_INFO, INFO_MAC_UNKNOWN);
    pub const INFO_HW_VERSION: Register = Register::indexed(REG_INFO, INFO_HW_VERSION);
    pub const INFO_FW_VERSION: Register = Register::indexed(REG_INFO, INFO_FW_VERSION);
    pub const INFO_MAC: Register = Register::indexed(REG_INFO, INFO_MAC);

    /// A register by address. Multi-registers get sub-register 0.
    #[must_use]
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            sub: if is_multi_register(address) {
                Some(0)
            } else {
                None
            },
        }
    }

    /// A sub-register of a multi-register.
    ///
    /// For plain registers the index is ignored.
    #[must_use]
    pub const fn indexed(address: u8, sub: u8) -> Self {
        Self {
            address,
            sub: if is_multi_register(address) {
                Some(sub)
            } else {
                None
            },
        }
    }

    /// Color buffer sub-register `index`.
    #[must_use]
    pub const fn buffer(index: u8) -> Self {
        Self::indexed(REG_BUFFER, index)
    }

    /// Build from the packed `address << 8 | sub` form used by diagnostics.
    #[must_use]
    pub const fn from_packed(packed: u16) -> Self {
        if packed > 0xFF {
            Self::indexed((packed >> 8) as u8, (packed & 0xFF) as u8)
        } else {
            Self::new(packed as u8)
        }
    }

    /// Primary register address.
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Sub-register index, present only for multi-registers.
    #[must_use]
    pub const fn sub(&self) -> Option<u8> {
        self.sub
    }

    /// Number of bytes this register occupies after the command byte.
    #[must_use]
    pub const fn wire_len(&self) -> usize {
        if self.sub.is_some() { 2 } else { 1 }
    }

    /// Append the wire bytes of this register to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.address);
        if let Some(sub) = self.sub {
            out.push(sub);
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub {
            Some(sub) => write!(f, "{:02x}{:02x}", self.address, sub),
            None => write!(f, "{:02x}", self.address),
        }
    }
}

/// The (command, register) pair identifying a request and its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterKey {
    pub command: Command,
    pub register: Register,
}

impl RegisterKey {
    /// Create a key.
    #[must_use]
    pub const fn new(command: Command, register: Register) -> Self {
        Self { command, register }
    }

    /// Key of a read reply.
    #[must_use]
    pub const fn read(register: Register) -> Self {
        Self::new(Command::Read, register)
    }

    /// Key of a write acknowledgement.
    #[must_use]
    pub const fn write(register: Register) -> Self {
        Self::new(Command::Write, register)
    }

    /// Wire bytes of the key (command followed by register bytes).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3);
        out.push(self.command.byte());
        self.register.write_to(&mut out);
        out
    }
}

impl fmt::Display for RegisterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{}", self.command.byte(), self.register)
    }
}

/// Key the device acknowledges a whole multi-part write on.
///
/// The ack always reports pseudo-register `0x02`, whatever was sent.
pub const MULTI_ACK: RegisterKey = RegisterKey::new(Command::Multi, Register::new(0x02));
