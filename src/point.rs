/// A weighted coordinate in `N`-dimensional color space.
///
/// For RGB input `N = 3` and every coordinate is an integer channel value in
/// `0..=255`; `weight` is the number of source pixels that share the color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<const N: usize> {
    pub coords: [f64; N],
    pub weight: u64,
}

impl<const N: usize> Point<N> {
    pub fn new(coords: [f64; N], weight: u64) -> Self {
        Self { coords, weight }
    }
}

impl From<([u8; 3], u64)> for Point<3> {
    fn from((rgb, weight): ([u8; 3], u64)) -> Self {
        Self::new(rgb.map(f64::from), weight)
    }
}

/// Plain Euclidean distance. Weights never enter the metric.
#[inline(always)]
pub fn euclidean<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Weight-averaged centroid of the given points, or `None` when they carry no
/// weight at all (an empty cluster).
pub fn centroid<'a, const N: usize, I>(points: I) -> Option<[f64; N]>
where
    I: IntoIterator<Item = &'a Point<N>>,
{
    let mut sums = [0.0f64; N];
    let mut total = 0u64;
    for p in points {
        total += p.weight;
        let w = p.weight as f64;
        for (sum, c) in sums.iter_mut().zip(p.coords.iter()) {
            *sum += c * w;
        }
    }
    if total == 0 {
        return None;
    }
    let total = total as f64;
    Some(sums.map(|s| s / total))
}
