use std::collections::BTreeMap;

use image::DynamicImage;

use crate::point::Point;

/// Distinct RGB colors of an image and how many pixels carry each one.
///
/// Colors iterate in ascending channel order, so the same image always
/// yields the same point sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: BTreeMap<[u8; 3], u64>,
}

impl Histogram {
    /// Counts every pixel. Alpha is dropped, not composited.
    pub fn from_image(img: &DynamicImage) -> Self {
        img.to_rgb8().pixels().map(|p| p.0).collect()
    }

    /// Counts only pixels with non-zero alpha.
    pub fn from_image_opaque(img: &DynamicImage) -> Self {
        img.to_rgba8()
            .pixels()
            .filter(|p| p[3] != 0)
            .map(|p| [p[0], p[1], p[2]])
            .collect()
    }

    /// Number of distinct colors.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of pixels counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn get(&self, color: [u8; 3]) -> u64 {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = ([u8; 3], u64)> + '_ {
        self.counts.iter().map(|(c, n)| (*c, *n))
    }

    pub fn points(&self) -> Vec<Point<3>> {
        self.iter().map(Point::from).collect()
    }
}

impl FromIterator<[u8; 3]> for Histogram {
    fn from_iter<I: IntoIterator<Item = [u8; 3]>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for color in iter {
            *counts.entry(color).or_insert(0u64) += 1;
        }
        Self { counts }
    }
}
