//! QR code encoding and rendering.
//!
//! The generator re-validates every URL it is handed, encodes it at the
//! highest error correction level in the smallest symbol that fits, and
//! renders the result as PNG or SVG. Output is deterministic: equal inputs
//! produce byte-identical images.

pub mod color;
pub mod errors;
pub mod format;
pub mod output;
pub mod render;

use std::path::{Path, PathBuf};

use qrcode::{EcLevel, QrCode, Version};
use tracing::{debug, instrument, warn};

use crate::url_validator::{NormalizedUrl, UrlValidator};

pub use color::{Color, ColorParseError};
pub use errors::{ErrorKind, GenerationError, QrError};
pub use format::OutputFormat;
pub use render::{RenderOptions, DEFAULT_BORDER, DEFAULT_MODULE_SIZE, RECOMMENDED_MIN_BORDER};

/// Error correction used for every symbol (level H, about 30% of codewords
/// recoverable).
pub const ERROR_CORRECTION: EcLevel = EcLevel::H;

/// Result of a generation call: the encoded image, or where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrImage {
    Bytes(Vec<u8>),
    Saved(PathBuf),
}

impl QrImage {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            QrImage::Bytes(bytes) => Some(bytes),
            QrImage::Saved(_) => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            QrImage::Bytes(_) => None,
            QrImage::Saved(path) => Some(path),
        }
    }
}

/// Encodes `data` at [`ERROR_CORRECTION`], picking the smallest version from
/// 1 to 40 whose capacity holds it.
pub fn encode(data: &str) -> Result<QrCode, GenerationError> {
    Ok(QrCode::with_error_correction_level(data.as_bytes(), ERROR_CORRECTION)?)
}

/// Stateless QR renderer bound to a URL validation policy.
#[derive(Debug, Clone, Default)]
pub struct QrGenerator {
    validator: UrlValidator,
}

impl QrGenerator {
    pub fn new(validator: UrlValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    /// Generates a QR code for `url` in the named `format`.
    ///
    /// The format is checked before anything else, so an unsupported format is
    /// reported even when the URL is also invalid. With `output_path` the image
    /// is written there and its absolute path returned; otherwise the encoded
    /// bytes are returned.
    pub fn generate(
        &self,
        url: &str,
        format: &str,
        options: &RenderOptions,
        output_path: Option<&Path>,
    ) -> Result<QrImage, QrError> {
        let format: OutputFormat = format.parse()?;
        self.generate_as(url, format, options, output_path)
    }

    /// Same as [`QrGenerator::generate`] with an already parsed format.
    #[instrument(level = "debug", skip(self, format, options, output_path), fields(format = %format))]
    pub fn generate_as(
        &self,
        url: &str,
        format: OutputFormat,
        options: &RenderOptions,
        output_path: Option<&Path>,
    ) -> Result<QrImage, QrError> {
        // The caller may have validated already; check again regardless
        let normalized = self
            .validator
            .validate(url)
            .map_err(|source| QrError::InvalidUrl {
                url: url.to_string(),
                source,
            })?;

        let bytes = self.render(&normalized, format, options)?;

        match output_path {
            Some(path) => {
                let saved = output::write_atomic(path, &bytes)
                    .map_err(|e| QrError::generation(normalized.as_str(), e))?;
                debug!("Saved {} QR code to {}", format, saved.display());
                Ok(QrImage::Saved(saved))
            }
            None => Ok(QrImage::Bytes(bytes)),
        }
    }

    /// Encodes and renders an already validated URL.
    pub fn render(
        &self,
        url: &NormalizedUrl,
        format: OutputFormat,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, QrError> {
        if options.border < RECOMMENDED_MIN_BORDER {
            warn!(
                "Border of {} modules is below the recommended {}; some scanners may fail",
                options.border, RECOMMENDED_MIN_BORDER
            );
        }

        let code = encode(url.as_str()).map_err(|e| QrError::generation(url.as_str(), e))?;
        debug!(
            "Encoded {} bytes into QR version {} ({} modules)",
            url.as_str().len(),
            version_number(code.version()),
            code.width()
        );

        let rendered = match format {
            OutputFormat::Png => render::render_png(&code, options),
            OutputFormat::Svg => render::render_svg(&code, options).map(String::into_bytes),
        };
        rendered.map_err(|e| QrError::generation(url.as_str(), e))
    }
}

fn version_number(version: Version) -> i16 {
    match version {
        Version::Normal(n) | Version::Micro(n) => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn test_encode_uses_smallest_version() {
        let small = encode("http://example.com").unwrap();
        let large = encode(&format!("http://example.com/{}", "a".repeat(300))).unwrap();
        assert_eq!(small.error_correction_level(), EcLevel::H);
        assert!(version_number(small.version()) < version_number(large.version()));
        assert!(version_number(small.version()) <= 3);
    }

    #[test]
    fn test_encode_fails_beyond_capacity() {
        let too_long = format!("http://example.com/{}", "a".repeat(1_400));
        assert!(matches!(encode(&too_long), Err(GenerationError::Encode(_))));
    }

    #[test]
    fn test_generate_png_bytes() {
        let generator = QrGenerator::default();
        let image = generator
            .generate("http://example.com", "PNG", &RenderOptions::default(), None)
            .unwrap();
        let bytes = image.as_bytes().unwrap();
        assert!(bytes.starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn test_unsupported_format_checked_first() {
        let generator = QrGenerator::default();
        for url in ["http://example.com", "javascript:alert(1)", ""] {
            let err = generator
                .generate(url, "JPG", &RenderOptions::default(), None)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        }
    }

    #[test]
    fn test_invalid_url_rejected_before_rendering() {
        let generator = QrGenerator::default();
        let err = generator
            .generate("http://127.0.0.1/admin", "svg", &RenderOptions::default(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert!(err.to_string().contains("http://127.0.0.1/admin"));
    }

    #[test]
    fn test_capacity_overflow_is_generation_failure() {
        let generator = QrGenerator::default();
        let url = format!("https://example.com/{}", "x".repeat(2_000));
        let err = generator
            .generate(&url, "png", &RenderOptions::default(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationFailed);
    }
}
