use palette::Srgb;

use crate::error::{Error, Result};
use crate::format;
use crate::histogram::Histogram;
use crate::point::{Point, centroid};

/// A box of histogram entries for median cut subdivision.
#[derive(Debug, Clone)]
struct ColorBox {
    entries: Vec<([u8; 3], u64)>,
}

impl ColorBox {
    fn new(entries: Vec<([u8; 3], u64)>) -> Self {
        Self { entries }
    }

    fn weight(&self) -> u64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Channel with the largest spread, and that spread.
    fn widest(&self) -> (usize, u8) {
        let mut lo = [u8::MAX; 3];
        let mut hi = [u8::MIN; 3];
        for (color, _) in &self.entries {
            for ch in 0..3 {
                lo[ch] = lo[ch].min(color[ch]);
                hi[ch] = hi[ch].max(color[ch]);
            }
        }
        (0..3)
            .map(|ch| (ch, hi[ch] - lo[ch]))
            .fold((0, 0), |best, next| if next.1 > best.1 { next } else { best })
    }

    /// Heavier boxes with more spread split first.
    fn priority(&self) -> u64 {
        self.weight() * self.widest().1 as u64
    }

    fn mean(&self) -> Srgb<u8> {
        let points = self.entries.iter().map(|&e| Point::<3>::from(e)).collect::<Vec<_>>();
        centroid(points.iter())
            .map(|c| format::to_srgb(&c))
            .unwrap_or_else(|| Srgb::new(0, 0, 0))
    }

    /// Split along the widest channel at the weighted median. Both halves
    /// keep at least one entry.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (axis, _) = self.widest();
        self.entries.sort_unstable_by_key(|(color, _)| (color[axis], *color));

        let total = self.weight();
        let mut accumulated = 0u64;
        let mut split_idx = 1;
        for (i, (_, w)) in self.entries.iter().enumerate() {
            accumulated += w;
            if accumulated * 2 >= total {
                split_idx = i + 1;
                break;
            }
        }
        split_idx = split_idx.clamp(1, self.entries.len() - 1);

        let right = self.entries.split_off(split_idx);
        (ColorBox::new(self.entries), ColorBox::new(right))
    }
}

/// Adaptive (median cut) palette of at most `colors` entries.
///
/// Every color of the histogram is mapped to its nearest palette entry;
/// entries nothing maps to are dropped and the rest come back most-used
/// first. A histogram with fewer distinct colors than `colors` yields at most
/// that many entries.
pub fn reduce(hist: &Histogram, colors: usize) -> Result<Vec<Srgb<u8>>> {
    if colors == 0 {
        return Err(Error::InvalidColorCount);
    }
    if hist.is_empty() {
        return Ok(Vec::new());
    }

    let mut boxes = vec![ColorBox::new(hist.iter().collect())];
    while boxes.len() < colors {
        let Some(idx) = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.entries.len() > 1)
            .max_by_key(|(_, b)| b.priority())
            .map(|(i, _)| i)
        else {
            break;
        };
        let (left, right) = boxes.swap_remove(idx).split();
        boxes.push(left);
        boxes.push(right);
    }

    let palette = boxes.iter().map(ColorBox::mean).collect::<Vec<_>>();
    let mut usage = vec![0u64; palette.len()];
    for (color, count) in hist.iter() {
        usage[nearest(&palette, color)] += count;
    }

    let mut used = (0..palette.len())
        .filter(|&i| usage[i] > 0)
        .collect::<Vec<_>>();
    used.sort_by(|&a, &b| usage[b].cmp(&usage[a]));
    log::debug!(
        "median cut: {} distinct colors into {} boxes, {} used",
        hist.len(),
        boxes.len(),
        used.len()
    );
    Ok(used.into_iter().map(|i| palette[i]).collect())
}

fn nearest(palette: &[Srgb<u8>], color: [u8; 3]) -> usize {
    let [r, g, b] = color.map(i32::from);
    let mut best = 0;
    let mut best_dist = i32::MAX;
    for (idx, c) in palette.iter().enumerate() {
        let dr = r - c.red as i32;
        let dg = g - c.green as i32;
        let db = b - c.blue as i32;
        let d = dr * dr + dg * dg + db * db;
        if d < best_dist {
            best_dist = d;
            best = idx;
        }
    }
    best
}
