//! Interpreting the mode register.
//!
//! The first byte of the mode register selects the mode. Scene mode carries
//! the scene code in the next two bytes (little-endian). Segment mode carries
//! nothing useful itself; the colors live in the color buffer, so decoding it
//! needs the segment colors fetched separately.

use govee_types::protocol::{MODE_SCENE, MODE_SEGMENT, SEGMENT_COUNT};
use govee_types::{Argb, Mode};

use crate::error::{Error, Result};
use crate::scenes::scene_name;

/// Name reported for scene codes without a built-in name.
pub const UNKNOWN_SCENE: &str = "Unknown";

/// First decoding step of a mode register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// A scene with the given code.
    Scene(u16),
    /// Segment colors; the color buffer must be read to finish decoding.
    Segments,
}

/// Classify a raw mode register value.
///
/// An empty value means the mode byte was zero and stripped as padding, and
/// is reported as `UnknownMode(0)`.
pub fn classify(value: &[u8]) -> Result<ModeKind> {
    match value.first().copied() {
        Some(MODE_SCENE) => {
            let lo = value.get(1).copied().unwrap_or(0);
            let hi = value.get(2).copied().unwrap_or(0);
            Ok(ModeKind::Scene(u16::from_le_bytes([lo, hi])))
        }
        Some(MODE_SEGMENT) => Ok(ModeKind::Segments),
        Some(other) => Err(Error::UnknownMode(other)),
        None => Err(Error::UnknownMode(0)),
    }
}

/// Scene mode for `code`, named from the built-in table.
#[must_use]
pub fn scene_mode(code: u16) -> Mode {
    Mode::Scene {
        code,
        name: scene_name(code).unwrap_or(UNKNOWN_SCENE).to_string(),
    }
}

/// Segment colors collapsed into a solid color when all segments agree.
#[must_use]
pub fn segment_mode(segments: [Argb; SEGMENT_COUNT]) -> Mode {
    let first = segments[0];
    if segments.iter().all(|s| *s == first) {
        Mode::SolidColor { color: first }
    } else {
        Mode::SegmentColors { segments }
    }
}
