use wasm_bindgen::prelude::*;
use image::{self, DynamicImage, GenericImageView, imageops::FilterType};
use palette::Srgb;
use js_sys::{Uint8Array, Array, Object, Reflect};

pub mod dominant;
pub mod error;
pub mod format;
pub mod histogram;
pub mod kmeans;
pub mod point;
pub mod strategy;

pub use error::{Error, Result};
pub use histogram::Histogram;
pub use kmeans::{Cluster, ClusterSet, EmptyClusterPolicy, KMeans, KMeansOptions, cluster};
pub use point::Point;
pub use strategy::Strategy;

/// Side length of one swatch cell handed back to JavaScript.
const SWATCH_CELL: u32 = 32;

/// Everything besides the strategy and color count that shapes a palette.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Options {
    /// Shrink (nearest-neighbour) so the longest side is at most this many
    /// pixels before counting colors. Fewer distinct colors, faster k-means.
    pub downscale: Option<u32>,
    /// Ignore fully transparent pixels.
    pub skip_transparent: bool,
    pub kmeans: KMeansOptions,
}

// ------------------------------------------------------------
// Image → histogram
// ------------------------------------------------------------

fn downscale(img: &DynamicImage, scale: u32) -> Option<DynamicImage> {
    let (orig_w, orig_h) = img.dimensions();
    let max_side = orig_w.max(orig_h);
    if max_side <= scale || scale == 0 {
        return None;
    }
    let ratio = scale as f32 / max_side as f32;
    let w = ((orig_w as f32) * ratio).round().max(1.0) as u32;
    let h = ((orig_h as f32) * ratio).round().max(1.0) as u32;
    log::debug!("downscaling {}x{} to {}x{}", orig_w, orig_h, w, h);
    Some(DynamicImage::ImageRgba8(image::imageops::resize(img, w, h, FilterType::Nearest)))
}

/// Color histogram of `img` after the optional downscale.
pub fn histogram(img: &DynamicImage, options: &Options) -> Histogram {
    let scaled = options.downscale.and_then(|s| downscale(img, s));
    let working = scaled.as_ref().unwrap_or(img);
    if options.skip_transparent {
        Histogram::from_image_opaque(working)
    } else {
        Histogram::from_image(working)
    }
}

// ------------------------------------------------------------
// Palettes
// ------------------------------------------------------------

/// Median-cut palette, most-used color first.
pub fn dominant_palette(img: &DynamicImage, colors: usize, options: &Options) -> Result<Vec<Srgb<u8>>> {
    dominant::reduce(&histogram(img, options), colors)
}

/// One color per k-means cluster, in cluster order.
pub fn kmeans_palette(img: &DynamicImage, colors: usize, options: &Options) -> Result<Vec<Srgb<u8>>> {
    let hist = histogram(img, options);
    log::info!(
        "clustering {} distinct colors ({} pixels) into {}",
        hist.len(),
        hist.total(),
        colors
    );
    let clusters = KMeans::with_options(colors, options.kmeans).run(&hist.points())?;
    Ok(clusters.colors())
}

pub fn extract_palette(
    img: &DynamicImage,
    strategy: Strategy,
    colors: usize,
    options: &Options,
) -> Result<Vec<Srgb<u8>>> {
    match strategy {
        Strategy::Dominant => dominant_palette(img, colors, options),
        Strategy::KMeans => kmeans_palette(img, colors, options),
    }
}

/// Decodes `input` and returns the palette as `#rrggbb` strings.
pub fn extract_palette_bytes(
    input: &[u8],
    strategy: Strategy,
    colors: usize,
    options: &Options,
) -> Result<Vec<String>> {
    let img = image::load_from_memory(input)?;
    let palette = extract_palette(&img, strategy, colors, options)?;
    Ok(palette.into_iter().map(format::hex).collect())
}

// ------------------------------------------------------------
// JavaScript entry point
// ------------------------------------------------------------

fn js_error(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Extract a palette from an encoded image.
///
/// `strategy` accepts `dominant`, `d`, `k-means` or `k`. The returned object
/// holds `palette` (an array of `#rrggbb` strings) and `swatch` (PNG bytes of
/// the palette as a strip of squares).
#[wasm_bindgen(js_name = extractPalette)]
pub fn extract_palette_js(input: Vec<u8>, strategy: &str, n_colors: usize) -> std::result::Result<Object, JsValue> {
    let strategy: Strategy = strategy.parse().map_err(js_error)?;
    let img = image::load_from_memory(&input).map_err(|e| js_error(e.into()))?;
    let colors = extract_palette(&img, strategy, n_colors, &Options::default()).map_err(js_error)?;
    let swatch = format::swatch_png(&colors, SWATCH_CELL).map_err(js_error)?;

    let palette_js = Array::new();
    for c in &colors {
        palette_js.push(&JsValue::from_str(&format::hex(*c)));
    }

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("palette"), &palette_js)?;
    Reflect::set(&result, &JsValue::from_str("swatch"), &Uint8Array::from(swatch.as_slice()))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn stripes(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 { Rgba([200, 10, 10, 255]) } else { Rgba([10, 10, 200, 255]) }
        }))
    }

    #[test]
    fn downscale_keeps_aspect_ratio() {
        let small = downscale(&stripes(400, 100), 40).unwrap();
        assert_eq!(small.dimensions(), (40, 10));
        assert!(downscale(&stripes(20, 10), 40).is_none());
    }

    #[test]
    fn histogram_honours_downscale() {
        let options = Options { downscale: Some(10), ..Options::default() };
        let hist = histogram(&stripes(100, 50), &options);
        assert_eq!(hist.total(), 10 * 5);
        assert_eq!(hist.len(), 2);
    }

    #[test]
    fn strategies_route_to_their_reducers() {
        let img = stripes(8, 8);
        let mut options = Options::default();
        options.kmeans.seed = Some(3);
        let mut kmeans = extract_palette(&img, Strategy::KMeans, 2, &options).unwrap();
        kmeans.sort_by_key(|c| c.red);
        assert_eq!(kmeans, vec![Srgb::new(10u8, 10, 200), Srgb::new(200u8, 10, 10)]);
        let dominant = extract_palette(&img, Strategy::Dominant, 4, &options).unwrap();
        assert_eq!(dominant.len(), 2);
    }
}
