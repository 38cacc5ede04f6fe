use std::collections::HashSet;

use palette::Srgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::format;
use crate::point::{Point, centroid, euclidean};

/// Stop once no center moves by this much or more (same unit as the channels).
pub const DEFAULT_MIN_DIFF: f64 = 1.0;
/// Hard stop for runs that never settle.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// What to do when an assignment phase leaves a cluster without members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyClusterPolicy {
    /// Abort the run with [`Error::EmptyClusterDivideByZero`].
    #[default]
    Fail,
    /// Move the point farthest from its own center into the empty cluster.
    Reseed,
}

/// Knobs shared by every run, independent of `k`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KMeansOptions {
    pub min_diff: f64,
    pub max_iterations: usize,
    /// Fixed seed for the initial sampling. `None` draws a fresh one per run.
    pub seed: Option<u64>,
    pub empty_clusters: EmptyClusterPolicy,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            min_diff: DEFAULT_MIN_DIFF,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
            empty_clusters: EmptyClusterPolicy::default(),
        }
    }
}

/// One cluster of a run: indices of its member points plus their weighted centroid.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster<const N: usize> {
    pub members: Vec<usize>,
    pub center: [f64; N],
}

impl<const N: usize> Cluster<N> {
    fn seed(index: usize, point: &Point<N>) -> Self {
        Self {
            members: vec![index],
            center: point.coords,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total pixel weight of the members.
    pub fn weight(&self, points: &[Point<N>]) -> u64 {
        self.members.iter().map(|&i| points[i].weight).sum()
    }
}

/// The `k` clusters a run ends with, in seed order, plus how the run went.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterSet<const N: usize> {
    pub clusters: Vec<Cluster<N>>,
    pub iterations: usize,
    /// Largest center movement of the last iteration.
    pub shift: f64,
    /// False when the iteration cap ended the run.
    pub converged: bool,
}

impl<const N: usize> ClusterSet<N> {
    pub fn k(&self) -> usize {
        self.clusters.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster<N>> {
        self.clusters.iter()
    }

    pub fn centers(&self) -> impl Iterator<Item = &[f64; N]> {
        self.clusters.iter().map(|c| &c.center)
    }
}

impl ClusterSet<3> {
    /// Centers as truncated sRGB colors, cluster-index order.
    pub fn colors(&self) -> Vec<Srgb<u8>> {
        self.centers().map(format::to_srgb).collect()
    }

    pub fn hex(&self) -> Vec<String> {
        self.colors().into_iter().map(format::hex).collect()
    }
}

/// Lloyd-style k-means over weighted points.
///
/// Seeds are `k` distinct input points drawn without replacement. Every
/// iteration assigns each point to its nearest center (lowest index wins a
/// tie), replaces each center with the weighted centroid of its members and
/// stops once the largest center movement drops below `min_diff`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KMeans {
    k: usize,
    options: KMeansOptions,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self::with_options(k, KMeansOptions::default())
    }

    pub fn with_options(k: usize, options: KMeansOptions) -> Self {
        Self { k, options }
    }

    pub fn min_diff(mut self, min_diff: f64) -> Self {
        self.options.min_diff = min_diff;
        self
    }

    /// At least one iteration always runs.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.options.max_iterations = max_iterations.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    pub fn empty_clusters(mut self, policy: EmptyClusterPolicy) -> Self {
        self.options.empty_clusters = policy;
        self
    }

    pub fn options(&self) -> &KMeansOptions {
        &self.options
    }

    /// Runs with a private random source: seeded from the options when a
    /// seed is set, from the thread generator otherwise.
    pub fn run<const N: usize>(&self, points: &[Point<N>]) -> Result<ClusterSet<N>> {
        match self.options.seed {
            Some(seed) => self.run_with_rng(points, &mut StdRng::seed_from_u64(seed)),
            None => self.run_with_rng(points, &mut rand::rng()),
        }
    }

    pub fn run_with_rng<const N: usize, R>(
        &self,
        points: &[Point<N>],
        rng: &mut R,
    ) -> Result<ClusterSet<N>>
    where
        R: Rng + ?Sized,
    {
        self.validate(points)?;

        let mut clusters = rand::seq::index::sample(rng, points.len(), self.k)
            .into_iter()
            .map(|i| Cluster::seed(i, &points[i]))
            .collect::<Vec<_>>();

        let limit = self.options.max_iterations.max(1);
        let mut shift = f64::INFINITY;
        for iteration in 1..=limit {
            let (mut members, mut distances) = assign(points, &clusters);
            self.heal(&mut members, &mut distances, iteration)?;

            shift = 0.0f64;
            for (index, (cluster, members)) in clusters.iter_mut().zip(members).enumerate() {
                let center = centroid(members.iter().map(|&i| &points[i])).ok_or(
                    Error::EmptyClusterDivideByZero {
                        cluster: index,
                        iteration,
                    },
                )?;
                shift = shift.max(euclidean(&cluster.center, &center));
                *cluster = Cluster { members, center };
            }
            log::debug!("{:<32}{:<8}{:.4}", "kmeans iteration shift", iteration, shift);

            if shift < self.options.min_diff {
                log::info!(
                    "kmeans converged: k={} points={} iterations={}",
                    self.k,
                    points.len(),
                    iteration
                );
                return Ok(ClusterSet {
                    clusters,
                    iterations: iteration,
                    shift,
                    converged: true,
                });
            }
        }

        log::warn!(
            "kmeans stopped after {} iterations without converging (shift {:.4})",
            limit,
            shift
        );
        Ok(ClusterSet {
            clusters,
            iterations: limit,
            shift,
            converged: false,
        })
    }

    fn validate<const N: usize>(&self, points: &[Point<N>]) -> Result<()> {
        if points.is_empty() {
            return Err(Error::EmptyInput);
        }
        let min_diff = self.options.min_diff;
        if min_diff.is_nan() || min_diff < 0.0 {
            return Err(Error::InvalidThreshold(min_diff));
        }
        if let Some(index) = points.iter().position(|p| p.weight == 0) {
            return Err(Error::ZeroWeight { index });
        }
        let distinct = points
            .iter()
            .map(|p| p.coords.map(f64::to_bits))
            .collect::<HashSet<_>>()
            .len();
        if self.k == 0 || self.k > distinct {
            return Err(Error::InvalidClusterCount { k: self.k, distinct });
        }
        Ok(())
    }

    /// Applies the empty-cluster policy to a fresh assignment.
    fn heal(
        &self,
        members: &mut [Vec<usize>],
        distances: &mut [f64],
        iteration: usize,
    ) -> Result<()> {
        for cluster in 0..members.len() {
            if !members[cluster].is_empty() {
                continue;
            }
            let fail = Error::EmptyClusterDivideByZero { cluster, iteration };
            if self.options.empty_clusters == EmptyClusterPolicy::Fail {
                return Err(fail);
            }
            // farthest point among clusters that can spare one
            let mut farthest: Option<(usize, usize)> = None;
            let mut best = f64::NEG_INFINITY;
            for (donor, list) in members.iter().enumerate().filter(|(_, l)| l.len() > 1) {
                for (slot, &p) in list.iter().enumerate() {
                    if distances[p] > best {
                        best = distances[p];
                        farthest = Some((donor, slot));
                    }
                }
            }
            let (donor, slot) = farthest.ok_or(fail)?;
            let p = members[donor].swap_remove(slot);
            members[donor].sort_unstable();
            members[cluster].push(p);
            distances[p] = 0.0;
            log::warn!(
                "reseeded empty cluster {} with point {} from cluster {} (iteration {})",
                cluster,
                p,
                donor,
                iteration
            );
        }
        Ok(())
    }
}

/// Partitions point indices by nearest center. Also returns each point's
/// distance to the center it landed on.
fn assign<const N: usize>(
    points: &[Point<N>],
    clusters: &[Cluster<N>],
) -> (Vec<Vec<usize>>, Vec<f64>) {
    let mut members = vec![Vec::new(); clusters.len()];
    let mut distances = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let mut nearest = 0usize;
        let mut smallest = f64::INFINITY;
        for (j, cluster) in clusters.iter().enumerate() {
            let d = euclidean(&p.coords, &cluster.center);
            if d < smallest {
                smallest = d;
                nearest = j;
            }
        }
        members[nearest].push(i);
        distances.push(smallest);
    }
    (members, distances)
}

/// Clusters `points` into `k` groups with a fresh random seed and no other
/// configuration than the convergence threshold.
pub fn cluster<const N: usize>(points: &[Point<N>], k: usize, min_diff: f64) -> Result<ClusterSet<N>> {
    KMeans::new(k).min_diff(min_diff).run(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three loose blobs of colors with uneven weights.
    fn blobs() -> Vec<Point<3>> {
        let anchors = [[20.0, 30.0, 40.0], [200.0, 60.0, 10.0], [90.0, 220.0, 180.0]];
        let mut points = Vec::new();
        for (a, anchor) in anchors.iter().enumerate() {
            for dx in 0..4 {
                for dy in 0..4 {
                    let coords = [anchor[0] + dx as f64 * 3.0, anchor[1] + dy as f64 * 2.0, anchor[2]];
                    points.push(Point::new(coords, 1 + ((dx * 7 + dy * 3 + a) % 5) as u64));
                }
            }
        }
        points
    }

    fn run(k: usize, seed: u64) -> ClusterSet<3> {
        KMeans::new(k)
            .seed(seed)
            .empty_clusters(EmptyClusterPolicy::Reseed)
            .run(&blobs())
            .unwrap()
    }

    #[test]
    fn every_point_lands_in_exactly_one_cluster() {
        let points = blobs();
        let set = run(4, 11);
        let mut seen = set
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect::<Vec<_>>();
        seen.sort_unstable();
        assert_eq!(seen, (0..points.len()).collect::<Vec<_>>());
        assert_eq!(set.k(), 4);
    }

    #[test]
    fn stops_below_threshold() {
        let set = run(3, 5);
        assert!(set.converged);
        assert!(set.shift < DEFAULT_MIN_DIFF);
    }

    #[test]
    fn centers_are_weighted_centroids_of_members() {
        let points = blobs();
        let set = run(3, 3);
        for cluster in set.iter() {
            let expected = centroid(cluster.members.iter().map(|&i| &points[i])).unwrap();
            for (c, e) in cluster.center.iter().zip(expected.iter()) {
                assert!((c - e).abs() < 1e-9, "{c} vs {e}");
            }
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        assert_eq!(run(3, 42), run(3, 42));
    }

    #[test]
    fn single_cluster_lands_on_global_centroid_at_once() {
        let points = blobs();
        let global = centroid(points.iter()).unwrap();
        let first = KMeans::new(1).seed(9).max_iterations(1).run(&points).unwrap();
        assert_eq!(first.iterations, 1);
        for (c, g) in first.clusters[0].center.iter().zip(global.iter()) {
            assert!((c - g).abs() < 1e-9);
        }
        let full = KMeans::new(1).seed(9).run(&points).unwrap();
        assert!(full.converged);
        assert!(full.iterations <= 2);
        assert_eq!(full.clusters[0].members.len(), points.len());
    }

    #[test]
    fn cluster_count_must_fit_the_points() {
        let points = blobs();
        assert!(matches!(
            cluster(&points, 0, 1.0),
            Err(Error::InvalidClusterCount { k: 0, .. })
        ));
        assert!(matches!(
            cluster(&points, points.len() + 1, 1.0),
            Err(Error::InvalidClusterCount { distinct: 48, .. })
        ));
    }

    #[test]
    fn duplicates_do_not_count_as_distinct() {
        let points = vec![Point::new([1.0, 1.0, 1.0], 1); 3];
        assert!(matches!(
            cluster(&points, 2, 1.0),
            Err(Error::InvalidClusterCount { k: 2, distinct: 1 })
        ));
    }

    #[test]
    fn rejects_empty_input_and_bad_threshold() {
        let none: Vec<Point<3>> = Vec::new();
        assert!(matches!(cluster(&none, 1, 1.0), Err(Error::EmptyInput)));
        assert!(matches!(
            cluster(&blobs(), 2, -1.0),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(matches!(
            cluster(&blobs(), 2, f64::NAN),
            Err(Error::InvalidThreshold(_))
        ));
    }

    #[test]
    fn rejects_weightless_points() {
        let points = vec![Point::new([0.0; 3], 2), Point::new([9.0; 3], 0)];
        assert!(matches!(
            cluster(&points, 1, 1.0),
            Err(Error::ZeroWeight { index: 1 })
        ));
    }

    #[test]
    fn first_center_wins_a_tie() {
        let points = [Point::new([5.0, 0.0, 0.0], 1)];
        let near = |x: f64| Cluster {
            members: vec![],
            center: [x, 0.0, 0.0],
        };
        let (members, _) = assign(&points, &[near(0.0), near(10.0)]);
        assert_eq!(members, vec![vec![0], vec![]]);
        let (members, _) = assign(&points, &[near(10.0), near(0.0)]);
        assert_eq!(members, vec![vec![0], vec![]]);
    }

    #[test]
    fn empty_cluster_is_fatal_by_default() {
        let mut members = vec![vec![0, 1], vec![]];
        let mut distances = vec![0.0, 4.0];
        let result = KMeans::new(2).heal(&mut members, &mut distances, 3);
        assert!(matches!(
            result,
            Err(Error::EmptyClusterDivideByZero {
                cluster: 1,
                iteration: 3
            })
        ));
    }

    #[test]
    fn reseed_moves_the_farthest_point() {
        let mut members = vec![vec![0, 1, 2], vec![], vec![3]];
        let mut distances = vec![1.0, 7.5, 2.0, 9.0];
        KMeans::new(3)
            .empty_clusters(EmptyClusterPolicy::Reseed)
            .heal(&mut members, &mut distances, 1)
            .unwrap();
        // point 3 is farther but its cluster cannot spare it
        assert_eq!(members, vec![vec![0, 2], vec![1], vec![3]]);
        assert_eq!(distances[1], 0.0);
    }

    #[test]
    fn hex_output_follows_cluster_order() {
        let points = vec![
            Point::<3>::from(([255u8, 0, 16], 3u64)),
            Point::<3>::from(([0u8, 128, 255], 1u64)),
        ];
        let set = KMeans::new(2).seed(1).run(&points).unwrap();
        let mut hex = set.hex();
        assert_eq!(hex.len(), 2);
        hex.sort();
        assert_eq!(hex, vec!["#0080ff".to_string(), "#ff0010".to_string()]);
        for (cluster, color) in set.iter().zip(set.hex()) {
            assert_eq!(color, format::center_hex(&cluster.center));
        }
    }
}
