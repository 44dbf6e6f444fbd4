//! Part point sampling: edge filtering followed by farthest-point sampling
//! down to a fixed count.

use rand::Rng;
use tracing::debug;

/// Axis-aligned bounds of a non-empty point set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn of(points: &[[f64; 3]]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            min: *first,
            max: *first,
        };
        for p in &points[1..] {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }
}

/// Drop points near the X/Y extremes of the set. The kept band on each axis
/// is `[min(lo + margin, lo + 2/5 ext), max(hi - margin, lo + 3/5 ext)]`, so
/// small parts always keep their central fifth. Returns the input unchanged
/// when the filter would leave nothing.
pub fn filter_edges(points: &[[f64; 3]], margin: f64) -> Vec<[f64; 3]> {
    let Some(bounds) = Bounds::of(points) else {
        return Vec::new();
    };
    let band = |axis: usize| {
        let lo = bounds.min[axis];
        let hi = bounds.max[axis];
        let ext = hi - lo;
        let low = (lo + margin).min(lo + ext * 2.0 / 5.0);
        let high = (hi - margin).max(lo + ext * 3.0 / 5.0);
        (low, high)
    };
    let (x_lo, x_hi) = band(0);
    let (y_lo, y_hi) = band(1);

    let kept: Vec<[f64; 3]> = points
        .iter()
        .filter(|p| p[0] >= x_lo && p[0] <= x_hi && p[1] >= y_lo && p[1] <= y_hi)
        .copied()
        .collect();
    if kept.is_empty() {
        debug!(
            points = points.len(),
            "edge filter removed every point; keeping unfiltered part"
        );
        return points.to_vec();
    }
    kept
}

/// Greedy farthest-point sampling. Starts from a random index and repeatedly
/// takes the point with the largest squared distance to the chosen set.
/// Always returns exactly `count` indices; inputs smaller than `count` yield
/// repeated indices. Empty input yields an empty vector.
pub fn farthest_point_indices<R: Rng + ?Sized>(
    points: &[[f64; 3]],
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }
    let mut chosen = Vec::with_capacity(count);
    let mut min_dist = vec![f64::INFINITY; points.len()];
    let mut farthest = rng.random_range(0..points.len());
    for _ in 0..count {
        chosen.push(farthest);
        let centroid = points[farthest];
        for (d, p) in min_dist.iter_mut().zip(points) {
            let dx = p[0] - centroid[0];
            let dy = p[1] - centroid[1];
            let dz = p[2] - centroid[2];
            let dist = dx * dx + dy * dy + dz * dz;
            if dist < *d {
                *d = dist;
            }
        }
        // First maximum wins on ties.
        farthest = min_dist
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |best, (i, &d)| {
                if d > best.1 {
                    (i, d)
                } else {
                    best
                }
            })
            .0;
    }
    chosen
}

/// Edge-filter a part and down-sample it to exactly `count` points.
pub fn sample_part<R: Rng + ?Sized>(
    points: &[[f64; 3]],
    count: usize,
    margin: f64,
    rng: &mut R,
) -> Vec<[f64; 3]> {
    let filtered = filter_edges(points, margin);
    farthest_point_indices(&filtered, count, rng)
        .into_iter()
        .map(|i| filtered[i])
        .collect()
}
