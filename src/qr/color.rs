use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An opaque RGB color used for QR modules and background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized color '{0}': use #rgb, #rrggbb or a CSS color name")]
pub struct ColorParseError(pub String);

// Common CSS color keywords, lowercase.
static NAMED_COLORS: Lazy<HashMap<&'static str, Color>> = Lazy::new(|| {
    [
        ("black", 0x000000),
        ("white", 0xffffff),
        ("red", 0xff0000),
        ("green", 0x008000),
        ("blue", 0x0000ff),
        ("yellow", 0xffff00),
        ("orange", 0xffa500),
        ("purple", 0x800080),
        ("gray", 0x808080),
        ("grey", 0x808080),
        ("silver", 0xc0c0c0),
        ("maroon", 0x800000),
        ("olive", 0x808000),
        ("lime", 0x00ff00),
        ("aqua", 0x00ffff),
        ("cyan", 0x00ffff),
        ("teal", 0x008080),
        ("navy", 0x000080),
        ("fuchsia", 0xff00ff),
        ("magenta", 0xff00ff),
        ("brown", 0xa52a2a),
        ("pink", 0xffc0cb),
        ("gold", 0xffd700),
        ("indigo", 0x4b0082),
        ("violet", 0xee82ee),
        ("crimson", 0xdc143c),
        ("coral", 0xff7f50),
        ("tomato", 0xff6347),
        ("salmon", 0xfa8072),
        ("beige", 0xf5f5dc),
        ("ivory", 0xfffff0),
        ("khaki", 0xf0e68c),
        ("lavender", 0xe6e6fa),
        ("chocolate", 0xd2691e),
        ("darkblue", 0x00008b),
        ("darkgreen", 0x006400),
        ("darkred", 0x8b0000),
        ("darkgray", 0xa9a9a9),
        ("darkgrey", 0xa9a9a9),
        ("darkslategray", 0x2f4f4f),
        ("darkslategrey", 0x2f4f4f),
        ("darkorange", 0xff8c00),
        ("darkviolet", 0x9400d3),
        ("dimgray", 0x696969),
        ("dimgrey", 0x696969),
        ("lightblue", 0xadd8e6),
        ("lightgreen", 0x90ee90),
        ("lightgray", 0xd3d3d3),
        ("lightgrey", 0xd3d3d3),
        ("lightyellow", 0xffffe0),
        ("midnightblue", 0x191970),
        ("royalblue", 0x4169e1),
        ("steelblue", 0x4682b4),
        ("skyblue", 0x87ceeb),
        ("slategray", 0x708090),
        ("slategrey", 0x708090),
        ("forestgreen", 0x228b22),
        ("seagreen", 0x2e8b57),
        ("whitesmoke", 0xf5f5f5),
        ("ghostwhite", 0xf8f8ff),
        ("snow", 0xfffafa),
    ]
    .into_iter()
    .map(|(name, rgb)| (name, Color::from_u24(rgb)))
    .collect()
});

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn from_u24(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Lowercase `#rrggbb` form, as written into SVG output.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let error = || ColorParseError(s.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(error());
            }
            return match hex.len() {
                3 => {
                    let value = u16::from_str_radix(hex, 16).map_err(|_| error())?;
                    // Each nibble doubled: #abc -> #aabbcc
                    let expand = |nibble: u16| ((nibble & 0xf) as u8) * 0x11;
                    Ok(Color::new(expand(value >> 8), expand(value >> 4), expand(value)))
                }
                6 => {
                    let value = u32::from_str_radix(hex, 16).map_err(|_| error())?;
                    Ok(Color::from_u24(value))
                }
                _ => Err(error()),
            };
        }

        NAMED_COLORS
            .get(trimmed.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(error)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
