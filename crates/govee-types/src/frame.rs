//! Fixed-size frame encoding and decoding.
//!
//! Every message on the wire is exactly [`FRAME_LEN`] bytes: a command byte,
//! the register key, the payload, zero padding, and a trailing checksum chosen
//! so that XOR over all twenty bytes is zero.

use bytes::Bytes;

use crate::error::{FrameError, FrameResult};
use crate::protocol::{Command, Register, RegisterKey, is_multi_register};

/// Size of every frame, checksum included.
pub const FRAME_LEN: usize = 20;

/// Largest payload after the command byte.
pub const MAX_PAYLOAD: usize = FRAME_LEN - 2;

/// Minimum number of significant (non-padding) bytes in a valid frame.
const MIN_SIGNIFICANT: usize = 3;

/// An encoded frame ready to write.
pub type RawFrame = [u8; FRAME_LEN];

/// XOR of all bytes in `data`.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Encode `payload` (register key plus data) behind `command`.
///
/// Fails with [`FrameError::TooLong`] when the payload cannot fit beside the
/// command byte and checksum.
pub fn encode(command: Command, payload: &[u8]) -> FrameResult<RawFrame> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::TooLong {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = command.byte();
    frame[1..=payload.len()].copy_from_slice(payload);
    frame[FRAME_LEN - 1] = checksum(&frame[..FRAME_LEN - 1]);
    Ok(frame)
}

/// Encode arbitrary bytes, command byte included, with padding and checksum.
///
/// Used for diagnostics where the leading byte may not be a known command.
pub fn encode_raw(data: &[u8]) -> FrameResult<RawFrame> {
    if data.len() >= FRAME_LEN {
        return Err(FrameError::TooLong {
            len: data.len(),
            max: FRAME_LEN - 1,
        });
    }
    let mut frame = [0u8; FRAME_LEN];
    frame[..data.len()].copy_from_slice(data);
    frame[FRAME_LEN - 1] = checksum(&frame[..FRAME_LEN - 1]);
    Ok(frame)
}

/// Encode a request for `key` with `data` following the register bytes.
pub fn encode_request(key: RegisterKey, data: &[u8]) -> FrameResult<RawFrame> {
    let mut payload = Vec::with_capacity(key.register.wire_len() + data.len());
    key.register.write_to(&mut payload);
    payload.extend_from_slice(data);
    encode(key.command, &payload)
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command and register the frame refers to.
    pub key: RegisterKey,
    /// Bytes after the key, with trailing zero padding removed.
    pub value: Bytes,
}

impl Frame {
    /// Decode a frame received from the device.
    ///
    /// Checks run in order: checksum, leading command byte, then shape.
    pub fn decode(data: &[u8]) -> FrameResult<Self> {
        let residue = checksum(data);
        if residue != 0 {
            return Err(FrameError::Checksum { residue });
        }

        let first = data
            .first()
            .copied()
            .ok_or_else(|| FrameError::Malformed("empty frame".to_string()))?;
        let command = Command::try_from(first)?;

        if data.len() != FRAME_LEN {
            return Err(FrameError::Malformed(format!(
                "expected {} bytes, got {}",
                FRAME_LEN,
                data.len()
            )));
        }
        if trim_padding(data).len() < MIN_SIGNIFICANT {
            return Err(FrameError::Malformed(format!(
                "fewer than {} significant bytes",
                MIN_SIGNIFICANT
            )));
        }

        // Body without checksum; zero padding is not part of the value.
        let body = trim_padding(&data[..FRAME_LEN - 1]);
        let address = body.get(1).copied().unwrap_or(0);
        let (register, key_len) = if is_multi_register(address) {
            let sub = body.get(2).copied().unwrap_or(0);
            (Register::indexed(address, sub), 3)
        } else {
            (Register::new(address), 2)
        };

        let value = body.get(key_len..).unwrap_or_default();
        Ok(Self {
            key: RegisterKey::new(command, register),
            value: Bytes::copy_from_slice(value),
        })
    }

    /// Payload bytes after the command: register key followed by the value.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.key.register.wire_len() + self.value.len());
        self.key.register.write_to(&mut out);
        out.extend_from_slice(&self.value);
        out
    }
}

/// Strip trailing zero bytes.
fn trim_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}
