use std::fmt::Write as _;
use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use qrcode::{Color as Module, QrCode};
use serde::{Deserialize, Serialize};

use super::color::Color;
use super::errors::GenerationError;

pub const DEFAULT_MODULE_SIZE: u32 = 10;
pub const DEFAULT_BORDER: u32 = 4;

/// Border width the QR standard asks for. Smaller borders are accepted but may
/// scan poorly.
pub const RECOMMENDED_MIN_BORDER: u32 = 4;

// Upper bound on the rendered side length, to keep a single request from
// allocating an enormous raster.
const MAX_IMAGE_DIMENSION: u64 = 16_384;

/// Visual parameters for a rendered QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Pixels per module (PNG) or user units per module (SVG).
    pub module_size: u32,
    /// Quiet-zone width in modules on each side.
    pub border: u32,
    /// Color of dark modules.
    pub fill: Color,
    /// Background and light module color.
    pub back: Color,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            module_size: DEFAULT_MODULE_SIZE,
            border: DEFAULT_BORDER,
            fill: Color::BLACK,
            back: Color::WHITE,
        }
    }
}

impl RenderOptions {
    /// Side length of the output in pixels for a symbol `modules` wide.
    pub fn pixel_dimension(&self, modules: u32) -> Result<u32, GenerationError> {
        if self.module_size == 0 {
            return Err(GenerationError::InvalidOptions(
                "module size must be at least 1".to_string(),
            ));
        }
        let side = (modules as u64 + 2 * self.border as u64) * self.module_size as u64;
        if side > MAX_IMAGE_DIMENSION {
            return Err(GenerationError::TooLarge(side));
        }
        Ok(side as u32)
    }
}

/// Rasterizes `code` and returns PNG-encoded bytes.
pub fn render_png(code: &QrCode, options: &RenderOptions) -> Result<Vec<u8>, GenerationError> {
    let modules = code.width() as u32;
    let side = options.pixel_dimension(modules)?;
    let fill = Rgb(options.fill.to_rgb());

    let mut img = RgbImage::from_pixel(side, side, Rgb(options.back.to_rgb()));
    for (index, module) in code.to_colors().iter().enumerate() {
        if *module != Module::Dark {
            continue;
        }
        let index = index as u32;
        let left = (index % modules + options.border) * options.module_size;
        let top = (index / modules + options.border) * options.module_size;
        for dy in 0..options.module_size {
            for dx in 0..options.module_size {
                img.put_pixel(left + dx, top + dy, fill);
            }
        }
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Renders `code` as an SVG 1.1 document.
///
/// The view box is measured in modules and the width and height attributes in
/// pixels, so the SVG displays at the same size as the equivalent PNG. Output
/// depends only on the inputs and always uses `\n` line endings.
pub fn render_svg(code: &QrCode, options: &RenderOptions) -> Result<String, GenerationError> {
    let modules = code.width() as u32;
    let side = options.pixel_dimension(modules)?;
    let view = modules + 2 * options.border;

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    // Writing to a String cannot fail
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{0}\" viewBox=\"0 0 {1} {1}\" shape-rendering=\"crispEdges\">",
        side, view
    );
    let _ = writeln!(svg, "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>", options.back.to_hex());

    svg.push_str("\t<path d=\"");
    let mut first = true;
    for (index, module) in code.to_colors().iter().enumerate() {
        if *module != Module::Dark {
            continue;
        }
        let index = index as u32;
        if !first {
            svg.push(' ');
        }
        first = false;
        let _ = write!(
            svg,
            "M{},{}h1v1h-1z",
            index % modules + options.border,
            index / modules + options.border
        );
    }
    let _ = writeln!(svg, "\" fill=\"{}\"/>", options.fill.to_hex());
    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrcode::EcLevel;

    fn sample_code() -> QrCode {
        QrCode::with_error_correction_level("https://example.com", EcLevel::H).unwrap()
    }

    #[test]
    fn test_png_dimensions_follow_options() {
        let code = sample_code();
        let options = RenderOptions {
            module_size: 3,
            border: 2,
            ..RenderOptions::default()
        };
        let bytes = render_png(&code, &options).unwrap();
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        let expected = (code.width() as u32 + 4) * 3;
        assert_eq!(img.width(), expected);
        assert_eq!(img.height(), expected);
    }

    #[test]
    fn test_png_uses_requested_colors() {
        let code = sample_code();
        let options = RenderOptions {
            module_size: 2,
            border: 4,
            fill: Color::new(0, 0, 0x8b),
            back: Color::new(0xad, 0xd8, 0xe6),
        };
        let bytes = render_png(&code, &options).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
        // Top-left corner is quiet zone, the first finder pattern starts at the border
        assert_eq!(img.get_pixel(0, 0).0, [0xad, 0xd8, 0xe6]);
        assert_eq!(img.get_pixel(8, 8).0, [0, 0, 0x8b]);
    }

    #[test]
    fn test_svg_structure() {
        let code = sample_code();
        let svg = render_svg(&code, &RenderOptions::default()).unwrap();
        let view = code.width() + 8;
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(&format!("viewBox=\"0 0 {0} {0}\"", view)));
        assert!(svg.contains(&format!("width=\"{}\"", view * 10)));
        assert!(svg.contains("fill=\"#ffffff\""));
        assert!(svg.contains("fill=\"#000000\""));
        // Finder pattern corner module sits right after the border
        assert!(svg.contains("M4,4h1v1h-1z"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn test_zero_module_size_rejected() {
        let options = RenderOptions {
            module_size: 0,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_png(&sample_code(), &options),
            Err(GenerationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_oversized_output_rejected() {
        let options = RenderOptions {
            module_size: 1_000,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_svg(&sample_code(), &options),
            Err(GenerationError::TooLarge(_))
        ));
    }

    #[test]
    fn test_zero_border_allowed() {
        let options = RenderOptions {
            border: 0,
            module_size: 1,
            ..RenderOptions::default()
        };
        let bytes = render_png(&sample_code(), &options).unwrap();
        assert!(!bytes.is_empty());
    }
}
