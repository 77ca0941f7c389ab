//! Last observed register values.
//!
//! The cache is filled only from inbound frames, never from what the caller
//! asked to write: read replies and write echoes both carry the register's
//! value as the light reports it, so a written value shows up once its echo
//! arrives. Multi-part acknowledgements carry no register value. There is no
//! expiry; the session's power heartbeat is the only thing that refreshes a
//! value without a caller asking.

use std::collections::HashMap;

use bytes::Bytes;

use govee_types::protocol::{SEGMENT_SLOT_OFFSET, SLOT_LEN, SLOTS_PER_SUBREGISTER};
use govee_types::{Argb, Command, Frame, Register};

/// Location of color buffer slot `slot`: the sub-register and byte offset.
#[must_use]
pub fn slot_location(slot: usize) -> (Register, usize) {
    let sub = (slot / SLOTS_PER_SUBREGISTER) as u8;
    let offset = (slot % SLOTS_PER_SUBREGISTER) * SLOT_LEN;
    (Register::buffer(sub), offset)
}

/// Color buffer slot holding segment `index`.
#[must_use]
pub const fn segment_slot(index: usize) -> usize {
    index + SEGMENT_SLOT_OFFSET
}

/// Extract the slot at `offset` from a buffer sub-register value.
///
/// Bytes beyond the end of `value` were padding on the wire and read as zero.
#[must_use]
pub fn slot_at(value: &[u8], offset: usize) -> Argb {
    Argb::from_slice(value.get(offset..).unwrap_or_default())
}

/// Register values keyed by register (sub-register included).
#[derive(Debug, Default)]
pub struct RegisterCache {
    values: HashMap<Register, Bytes>,
}

impl RegisterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the value carried by an inbound frame.
    ///
    /// Returns `true` if the frame was a read reply or write echo and was
    /// stored.
    pub fn update(&mut self, frame: &Frame) -> bool {
        if frame.key.command == Command::Multi {
            return false;
        }
        self.values.insert(frame.key.register, frame.value.clone());
        true
    }

    /// Cached value of `register`.
    #[must_use]
    pub fn get(&self, register: &Register) -> Option<Bytes> {
        self.values.get(register).cloned()
    }

    /// Cached color buffer slot, if its sub-register has been read.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<Argb> {
        let (register, offset) = slot_location(slot);
        self.values
            .get(&register)
            .map(|value| slot_at(value, offset))
    }

    /// Cached color of segment `index`.
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<Argb> {
        self.slot(segment_slot(index))
    }

    /// Number of cached registers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Snapshot of every cached register, ordered by register.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Register, Bytes)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .map(|(register, value)| (*register, value.clone()))
            .collect();
        entries.sort_by_key(|(register, _)| *register);
        entries
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
