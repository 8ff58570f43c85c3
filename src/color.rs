//! Color utility functions shared by classes and tile labels.
//!
//! Colors are stored as `#rrggbb` strings, which is also how they appear in
//! the JSON export. New classes get a distinct palette color by stepping the
//! hue around the color wheel with the golden angle.

/// Color given to the default class.
pub const DEFAULT_CLASS_COLOR: &str = "#00ff00";

/// Golden angle in degrees, used to spread palette hues.
const GOLDEN_ANGLE: f32 = 137.507_77;

/// HSV to RGB bytes. Hue in degrees, saturation and value in `0..=1`.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let hue = hue.rem_euclid(360.0);
    let chroma = value * saturation;
    let second = chroma * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let base = value - chroma;

    let [r, g, b] = match (hue / 60.0) as u32 {
        0 => [chroma, second, 0.0],
        1 => [second, chroma, 0.0],
        2 => [0.0, chroma, second],
        3 => [0.0, second, chroma],
        4 => [second, 0.0, chroma],
        _ => [chroma, 0.0, second],
    };
    [r, g, b].map(|c| ((c + base) * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Parse a `#rrggbb` string into RGB bytes.
///
/// The leading `#` is required. Hex digits may be upper or lower case.
pub fn parse_hex(value: &str) -> Option<[u8; 3]> {
    let digits = value.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Format RGB bytes as a lowercase `#rrggbb` string.
pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Normalize a color string to lowercase `#rrggbb`, or `None` if invalid.
pub fn normalize_hex(value: &str) -> Option<String> {
    parse_hex(value).map(to_hex)
}

/// Palette color for the `index`-th class.
pub fn palette_color(index: usize) -> String {
    let hue = (index as f32 * GOLDEN_ANGLE) % 360.0;
    to_hex(hsv_to_rgb(hue, 0.7, 0.95))
}
