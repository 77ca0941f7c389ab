//! Color and number parsing for text commands.

use govee_core::Rgb;

/// Tasmota's indexed color palette.
pub const PALETTE: [(&str, u32); 12] = [
    ("red", 0xFF0000),
    ("green", 0x00FF00),
    ("blue", 0x0000FF),
    ("orange", 0xFFA500),
    ("lightgreen", 0x90EE90),
    ("lightblue", 0xADD8E6),
    ("amber", 0xFFBF00),
    ("cyan", 0x00FFFF),
    ("purple", 0x800080),
    ("yellow", 0xFFFF00),
    ("pink", 0xFFC0CB),
    ("white", 0xFFFFFF),
];

/// Parse a color as `#rgb`, `#rrggbb`, `r,g,b`, a palette index or a palette
/// name.
///
/// Decimal channels are returned unchecked so that out-of-range values are
/// rejected by the light's own validation.
pub fn parse_color(text: &str) -> Option<(i32, i32, i32)> {
    let text = text.trim().to_lowercase();

    if text.contains(',') {
        let channels: Vec<i32> = text
            .split(',')
            .map(|c| {
                let c = c.trim();
                if c.is_empty() || c.len() > 3 || !c.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                c.parse().ok()
            })
            .collect::<Option<_>>()?;
        return match channels.as_slice() {
            [r, g, b] => Some((*r, *g, *b)),
            _ => None,
        };
    }

    let hex = text.strip_prefix('#').unwrap_or(&text);
    let is_hex = !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    if is_hex && hex.len() == 3 {
        let digits: Vec<i32> = hex
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|d| (d * 0x11) as i32)
            .collect();
        return Some((digits[0], digits[1], digits[2]));
    }
    if is_hex && hex.len() == 6 {
        let value = u32::from_str_radix(hex, 16).ok()?;
        return Some(split(Rgb::from_u32(value)));
    }

    if !text.is_empty() && text.len() <= 2 && text.bytes().all(|b| b.is_ascii_digit()) {
        let index: usize = text.parse().ok()?;
        return PALETTE.get(index).map(|(_, value)| split(Rgb::from_u32(*value)));
    }

    let name: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    PALETTE
        .iter()
        .find(|(palette_name, _)| *palette_name == name)
        .map(|(_, value)| split(Rgb::from_u32(*value)))
}

fn split(rgb: Rgb) -> (i32, i32, i32) {
    (i32::from(rgb.r), i32::from(rgb.g), i32::from(rgb.b))
}

/// Format a color as `#RRGGBB`.
pub fn format_color(r: u8, g: u8, b: u8) -> String {
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Parse an integer written in decimal or as `0x` hex.
pub fn fuzzy_int(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Parse a level as a fraction; values above 1 are read as percentages.
pub fn parse_level(text: &str) -> Option<f32> {
    let value: f32 = text.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if value > 1.0 { value / 100.0 } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_color("#f80"), Some((0xFF, 0x88, 0x00)));
        assert_eq!(parse_color("F80"), Some((0xFF, 0x88, 0x00)));
        assert_eq!(parse_color("#12aBef"), Some((0x12, 0xAB, 0xEF)));
        assert_eq!(parse_color("ff0000"), Some((255, 0, 0)));
    }

    #[test]
    fn test_parse_decimal_colors() {
        assert_eq!(parse_color("10, 20 ,30"), Some((10, 20, 30)));
        assert_eq!(parse_color("300,0,0"), Some((300, 0, 0)));
        assert_eq!(parse_color("1,2"), None);
        assert_eq!(parse_color("1,2,3000"), None);
    }

    #[test]
    fn test_parse_palette() {
        assert_eq!(parse_color("0"), Some((255, 0, 0)));
        assert_eq!(parse_color("11"), Some((255, 255, 255)));
        assert_eq!(parse_color("12"), None);
        assert_eq!(parse_color("Light Blue"), Some((0xAD, 0xD8, 0xE6)));
        assert_eq!(parse_color("amber"), Some((0xFF, 0xBF, 0x00)));
        assert_eq!(parse_color("mauve"), None);
        assert_eq!(parse_color(""), None);
    }

    #[test]
    fn test_format_color() {
        assert_eq!(format_color(255, 8, 0xab), "#FF08AB");
    }

    #[test]
    fn test_fuzzy_int() {
        assert_eq!(fuzzy_int("42"), Some(42));
        assert_eq!(fuzzy_int("0x2a"), Some(42));
        assert_eq!(fuzzy_int("sunrise"), None);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("0.5"), Some(0.5));
        assert_eq!(parse_level("50"), Some(0.5));
        assert_eq!(parse_level("1"), Some(1.0));
        assert_eq!(parse_level("bright"), None);
        assert_eq!(parse_level("nan"), None);
    }
}
