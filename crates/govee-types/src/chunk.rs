//! Multi-part write splitting.
//!
//! Payloads larger than a single frame go out as an initial frame carrying
//! the chunk count and the first [`INIT`] bytes, followed by sequenced
//! continuation frames of [`PAYLOAD`] bytes. The final continuation uses
//! sequence number `0xFF`. The device acknowledges the whole transfer once,
//! on [`MULTI_ACK`](crate::protocol::MULTI_ACK).

use crate::error::{FrameError, FrameResult};
use crate::frame::{RawFrame, encode};
use crate::protocol::Command;

/// Data bytes per continuation frame (frame minus command, sequence, checksum).
pub const PAYLOAD: usize = 17;

/// Data bytes in the initial frame (payload minus marker, count, and type).
pub const INIT: usize = PAYLOAD - 3;

/// Sequence number of the final continuation frame.
pub const LAST_SEQUENCE: u8 = 0xFF;

/// Number of continuation frames needed for `len` bytes.
#[must_use]
pub fn chunk_count(len: usize) -> usize {
    len.saturating_sub(INIT).div_ceil(PAYLOAD)
}

/// Split `data` into the frames of one multi-part write.
///
/// Fails with [`FrameError::TransferTooLong`] when the chunk count does not
/// fit the initial frame's count byte.
pub fn split(data: &[u8]) -> FrameResult<Vec<RawFrame>> {
    let chunks = chunk_count(data.len());
    let count = u8::try_from(chunks + 1)
        .map_err(|_| FrameError::TransferTooLong { len: data.len() })?;

    let (head, tail) = data.split_at(data.len().min(INIT));

    let mut frames = Vec::with_capacity(chunks + 1);
    let mut initial = Vec::with_capacity(4 + head.len());
    initial.extend_from_slice(&[0x00, 0x01, count, 0x02]);
    initial.extend_from_slice(head);
    frames.push(encode(Command::Multi, &initial)?);

    for (index, chunk) in tail.chunks(PAYLOAD).enumerate() {
        // index < chunks <= 254, so the sequence always fits.
        let seq = if index + 1 == chunks {
            LAST_SEQUENCE
        } else {
            (index + 1) as u8
        };
        let mut payload = Vec::with_capacity(1 + chunk.len());
        payload.push(seq);
        payload.extend_from_slice(chunk);
        frames.push(encode(Command::Multi, &payload)?);
    }

    Ok(frames)
}
