use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::QrError;

/// Image encodings the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Png, OutputFormat::Svg];

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Svg => "image/svg+xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => f.write_str("PNG"),
            OutputFormat::Svg => f.write_str("SVG"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = QrError;

    /// Case-insensitive; anything but PNG or SVG is refused.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PNG" => Ok(OutputFormat::Png),
            "SVG" => Ok(OutputFormat::Svg),
            _ => Err(QrError::UnsupportedFormat(s.to_string())),
        }
    }
}
