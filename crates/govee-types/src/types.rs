//! Lighting values carried by the register protocol.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::RangeError;
use crate::protocol::{MAX_PERCENT, SEGMENT_COUNT, SLOT_LEN};

/// A color with 8-bit channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a `0xRRGGBB` integer. Higher bits are ignored.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        }
    }

    /// The channels as wire bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl TryFrom<(i32, i32, i32)> for Rgb {
    type Error = RangeError;

    /// Validate each channel against 0..=255.
    fn try_from((r, g, b): (i32, i32, i32)) -> Result<Self, Self::Error> {
        let channel = |name: &'static str, value: i32| {
            u8::try_from(value).map_err(|_| RangeError::new(name, value, 0.0, 255.0))
        };
        Ok(Self {
            r: channel("Red", r)?,
            g: channel("Green", g)?,
            b: channel("Blue", b)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A color buffer slot: brightness followed by the color.
///
/// The brightness byte is a percentage (0-100) as stored by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Argb {
    pub brightness: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Argb {
    #[must_use]
    pub const fn new(brightness: u8, r: u8, g: u8, b: u8) -> Self {
        Self { brightness, r, g, b }
    }

    /// Parse a slot from up to [`SLOT_LEN`] bytes.
    ///
    /// Missing trailing bytes were stripped as padding on the wire and read
    /// as zero.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        let mut raw = [0u8; SLOT_LEN];
        let len = data.len().min(SLOT_LEN);
        raw[..len].copy_from_slice(&data[..len]);
        Self::new(raw[0], raw[1], raw[2], raw[3])
    }

    /// The color part of the slot.
    #[must_use]
    pub const fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    /// Brightness as a fraction 0.0-1.0.
    #[must_use]
    pub fn brightness_fraction(self) -> f32 {
        percent_to_fraction(self.brightness)
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% {}", self.brightness, self.rgb())
    }
}

/// Set of segments addressed by a color or brightness command.
///
/// Bit `i` selects segment `i`; only the low [`SEGMENT_COUNT`] bits are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentMask(u16);

impl SegmentMask {
    /// Every segment.
    pub const ALL: SegmentMask = SegmentMask((1 << SEGMENT_COUNT) - 1);

    /// Build from raw bits, discarding bits beyond the last segment.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// A mask selecting the single segment `index`.
    pub fn single(index: usize) -> Result<Self, RangeError> {
        if index >= SEGMENT_COUNT {
            return Err(RangeError::new(
                "Segment",
                index,
                0.0,
                (SEGMENT_COUNT - 1) as f64,
            ));
        }
        Ok(Self(1 << index))
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, index: usize) -> bool {
        index < SEGMENT_COUNT && self.0 & (1 << index) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Indices of the selected segments, ascending.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..SEGMENT_COUNT).filter(move |&i| self.contains(i))
    }

    /// The mask as it appears on the wire (little-endian).
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl Default for SegmentMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Current lighting mode of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Mode {
    /// Every segment shows the same color.
    SolidColor {
        color: Argb,
    },
    /// Segments show different colors.
    SegmentColors {
        segments: [Argb; SEGMENT_COUNT],
    },
    /// A built-in scene is playing.
    Scene {
        code: u16,
        name: String,
    },
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::SolidColor { color } => write!(f, "Color {}", color),
            Mode::SegmentColors { segments } => {
                write!(f, "Segments")?;
                for segment in segments {
                    write!(f, " {}", segment)?;
                }
                Ok(())
            }
            Mode::Scene { code, name } => write!(f, "Scene {} (0x{:04x})", name, code),
        }
    }
}

/// Convert a 0.0-1.0 fraction into the wire percentage.
///
/// `name` labels the quantity in the returned error.
pub fn fraction_to_percent(name: &'static str, value: f32) -> Result<u8, RangeError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(RangeError::new(name, value, 0.0, 1.0));
    }
    Ok((value * f32::from(MAX_PERCENT)).round() as u8)
}

/// Convert a wire percentage into a 0.0-1.0 fraction.
#[must_use]
pub fn percent_to_fraction(percent: u8) -> f32 {
    f32::from(percent) / f32::from(MAX_PERCENT)
}

/// Extract the model (e.g. `H6199`) from an advertised name.
///
/// Names look like `Govee_H6199_1a2b`: the `Govee_` prefix, `H` and four hex
/// digits, an underscore, and four more hex digits. Matching is
/// case-insensitive and anchored at the start; trailing text is allowed.
///
/// ```
/// use govee_types::model_from_name;
///
/// assert_eq!(model_from_name("Govee_H6199_1A2B").as_deref(), Some("H6199"));
/// assert_eq!(model_from_name("ihoment_H6199_1A2B"), None);
/// ```
#[must_use]
pub fn model_from_name(name: &str) -> Option<String> {
    const PREFIX: &str = "govee_";
    let bytes = name.as_bytes();
    if bytes.len() < PREFIX.len() + 5 + 1 + 4 {
        return None;
    }
    if !name.get(..PREFIX.len())?.eq_ignore_ascii_case(PREFIX) {
        return None;
    }

    let model = &bytes[PREFIX.len()..PREFIX.len() + 5];
    let suffix = &bytes[PREFIX.len() + 5..PREFIX.len() + 10];
    let model_ok =
        model[0].eq_ignore_ascii_case(&b'h') && model[1..].iter().all(u8::is_ascii_hexdigit);
    let suffix_ok = suffix[0] == b'_' && suffix[1..].iter().all(u8::is_ascii_hexdigit);

    if model_ok && suffix_ok {
        // All-ASCII by construction.
        Some(String::from_utf8_lossy(model).into_owned())
    } else {
        None
    }
}
