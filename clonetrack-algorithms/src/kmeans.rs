//! Two-cluster k-means on planar coordinates.
//!
//! Two routines are provided. [`kmeans_plus_plus`] (feature
//! `kmeans-plusplus`, on by default) seeds with k-means++ and keeps the best
//! of several restarts. [`lloyd`] is the plain fallback: random distinct
//! points as centroids and a fixed number of Lloyd iterations. [`two_means`]
//! dispatches to whichever routine the build selected.
//!
//! A point goes to cluster 1 only when strictly closer to centroid 1; an
//! emptied cluster keeps its previous centroid.

use clonetrack_core::Label;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "kmeans-plusplus")]
use rand::Rng;

/// Lloyd iterations run by the fallback routine.
pub const FALLBACK_ITERATIONS: usize = 30;

/// Restarts of the k-means++ routine.
pub const RESTARTS: usize = 10;

/// Iteration cap per k-means++ restart.
pub const MAX_ITERATIONS: usize = 300;

type Point = [f64; 2];

/// Splits `points` into two clusters using the routine selected at build time.
#[must_use]
pub fn two_means(points: &[Point], seed: u64) -> Vec<Label> {
    #[cfg(feature = "kmeans-plusplus")]
    {
        kmeans_plus_plus(points, seed)
    }
    #[cfg(not(feature = "kmeans-plusplus"))]
    {
        lloyd(points, seed)
    }
}

/// Fixed-iteration Lloyd's algorithm with random initial centroids.
///
/// Fewer than two points are all placed in cluster 0.
#[must_use]
pub fn lloyd(points: &[Point], seed: u64) -> Vec<Label> {
    let n = points.len();
    if n < 2 {
        return vec![Label::Vehicle0; n];
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let picked = rand::seq::index::sample(&mut rng, n, 2);
    let mut centroids = [points[picked.index(0)], points[picked.index(1)]];
    let mut labels = vec![Label::Vehicle0; n];

    for _ in 0..FALLBACK_ITERATIONS {
        assign(points, &centroids, &mut labels);
        update_centroids(points, &labels, &mut centroids);
    }

    labels
}

/// k-means++ seeding with [`RESTARTS`] runs; the lowest-inertia run wins
/// (earliest on ties).
#[cfg(feature = "kmeans-plusplus")]
#[must_use]
pub fn kmeans_plus_plus(points: &[Point], seed: u64) -> Vec<Label> {
    let n = points.len();
    if n < 2 {
        return vec![Label::Vehicle0; n];
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut best: Option<(f64, Vec<Label>)> = None;

    for _ in 0..RESTARTS {
        let mut centroids = seed_centroids(points, &mut rng);
        let mut labels = vec![Label::Vehicle0; n];
        assign(points, &centroids, &mut labels);

        for _ in 0..MAX_ITERATIONS {
            update_centroids(points, &labels, &mut centroids);
            if !assign(points, &centroids, &mut labels) {
                break;
            }
        }

        let score = inertia(points, &labels, &centroids);
        if best.as_ref().is_none_or(|(best_score, _)| score < *best_score) {
            best = Some((score, labels));
        }
    }

    best.map(|(_, labels)| labels).unwrap_or_default()
}

#[cfg(feature = "kmeans-plusplus")]
fn seed_centroids(points: &[Point], rng: &mut ChaCha8Rng) -> [Point; 2] {
    let n = points.len();
    let first = rng.gen_range(0..n);
    let weights: Vec<f64> = points
        .iter()
        .map(|p| dist_sq(*p, points[first]))
        .collect();
    let total: f64 = weights.iter().sum();

    let second = if total > 0.0 {
        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        weights
            .iter()
            .position(|w| {
                cumulative += w;
                cumulative > target
            })
            .unwrap_or(n - 1)
    } else {
        (first + 1) % n
    };

    [points[first], points[second]]
}

#[inline]
fn dist_sq(a: Point, b: Point) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Assigns each point to its nearest centroid. Returns true if any label
/// changed.
fn assign(points: &[Point], centroids: &[Point; 2], labels: &mut [Label]) -> bool {
    let mut changed = false;
    for (p, label) in points.iter().zip(labels.iter_mut()) {
        let nearest = if dist_sq(*p, centroids[1]) < dist_sq(*p, centroids[0]) {
            Label::Vehicle1
        } else {
            Label::Vehicle0
        };
        if *label != nearest {
            *label = nearest;
            changed = true;
        }
    }
    changed
}

#[allow(clippy::cast_precision_loss)]
fn update_centroids(points: &[Point], labels: &[Label], centroids: &mut [Point; 2]) {
    let mut sums = [[0.0; 2]; 2];
    let mut counts = [0usize; 2];
    for (p, label) in points.iter().zip(labels) {
        let k = label.index();
        sums[k][0] += p[0];
        sums[k][1] += p[1];
        counts[k] += 1;
    }
    for k in 0..2 {
        if counts[k] > 0 {
            centroids[k] = [sums[k][0] / counts[k] as f64, sums[k][1] / counts[k] as f64];
        }
    }
}

#[cfg(feature = "kmeans-plusplus")]
fn inertia(points: &[Point], labels: &[Label], centroids: &[Point; 2]) -> f64 {
    points
        .iter()
        .zip(labels)
        .map(|(p, label)| dist_sq(*p, centroids[label.index()]))
        .sum()
}
