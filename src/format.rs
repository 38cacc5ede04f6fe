use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use palette::Srgb;

use crate::error::{Error, Result};

/// Truncates (never rounds) each coordinate into a channel. Values outside
/// `0..=255` saturate.
pub fn to_srgb(center: &[f64; 3]) -> Srgb<u8> {
    let [r, g, b] = center.map(|c| c as u8);
    Srgb::new(r, g, b)
}

/// Lowercase `#rrggbb`.
pub fn hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

pub fn center_hex(center: &[f64; 3]) -> String {
    hex(to_srgb(center))
}

// ------------------------------------------------------------
// Palette swatch
// ------------------------------------------------------------

/// A horizontal strip of `cell`×`cell` squares, one per color, in order.
pub fn render_swatch(colors: &[Srgb<u8>], cell: u32) -> RgbImage {
    let cell = cell.max(1);
    let width = cell * colors.len() as u32;
    RgbImage::from_fn(width, cell, |x, _| {
        let c = colors[(x / cell) as usize];
        Rgb([c.red, c.green, c.blue])
    })
}

/// PNG-encoded [`render_swatch`].
pub fn swatch_png(colors: &[Srgb<u8>], cell: u32) -> Result<Vec<u8>> {
    if colors.is_empty() {
        return Err(Error::Encode("palette is empty".into()));
    }
    let swatch = DynamicImage::ImageRgb8(render_swatch(colors, cell));
    let mut buf = Vec::new();
    {
        let mut cursor = std::io::Cursor::new(&mut buf);
        swatch
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?;
    }
    Ok(buf)
}
