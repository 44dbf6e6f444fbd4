//! Top-down max-height rasterization of a scene and the egocentric crop read
//! from it each tick.

use nalgebra::{UnitQuaternion, Vector3};
use rstar::RTree;
use tracing::debug;

use crate::math::heading_quat;
use crate::sampler::Bounds;
use crate::spatial::{self, HeightSample};

/// Flattened `dim x dim` grid of `(x, y, max_z)` samples covering a scene's
/// planar bounds. Sample `j * dim + i` sits at the i-th x and j-th y position.
#[derive(Clone, Debug)]
pub struct HeightMap {
    pub dim: usize,
    pub samples: Vec<[f64; 3]>,
    index: RTree<HeightSample>,
}

impl HeightMap {
    /// Rasterize `points` into a `dim x dim` grid in one bucketing pass.
    ///
    /// Points with `z >= ceiling` contribute height 0. Empty cells and
    /// negative maxima read 0. Points on the upper bound of an axis fall
    /// outside the last bucket and are ignored.
    pub fn build(points: &[[f64; 3]], dim: usize, ceiling: f64) -> Self {
        let bounds = Bounds::of(points).unwrap_or(Bounds {
            min: [0.0; 3],
            max: [0.0; 3],
        });
        let (min_x, min_y) = (bounds.min[0], bounds.min[1]);
        let (max_x, max_y) = (bounds.max[0], bounds.max[1]);
        let interval_x = (max_x - min_x) / dim as f64;
        let interval_y = (max_y - min_y) / dim as f64;

        let mut heights: Vec<Option<f64>> = vec![None; dim * dim];
        for p in points {
            let ix = ((p[0] - min_x) / interval_x).floor();
            let iy = ((p[1] - min_y) / interval_y).floor();
            if !(ix.is_finite() && iy.is_finite()) {
                continue;
            }
            if ix < 0.0 || iy < 0.0 || ix >= dim as f64 || iy >= dim as f64 {
                continue;
            }
            let z = if p[2] < ceiling { p[2] } else { 0.0 };
            let cell = &mut heights[iy as usize * dim + ix as usize];
            *cell = Some(cell.map_or(z, |h| h.max(z)));
        }

        let linspace = |lo: f64, hi: f64, k: usize| {
            if dim > 1 {
                lo + (hi - lo) * k as f64 / (dim - 1) as f64
            } else {
                lo
            }
        };
        let mut samples = Vec::with_capacity(dim * dim);
        for j in 0..dim {
            let y = linspace(min_y, max_y, j);
            for i in 0..dim {
                let x = linspace(min_x, max_x, i);
                let h = heights[j * dim + i].unwrap_or(0.0).max(0.0);
                samples.push([x, y, h]);
            }
        }
        debug!(
            points = points.len(),
            dim,
            filled = heights.iter().filter(|h| h.is_some()).count(),
            "built heightmap"
        );

        let index = spatial::build_height_index(&samples);
        Self {
            dim,
            samples,
            index,
        }
    }

    /// Height at the sample nearest to `query` in the plane, 0 beyond tolerance.
    pub fn height_at(&self, query: [f64; 2], tolerance_sq: f64) -> f64 {
        spatial::lookup_height(&self.index, query, tolerance_sq)
    }
}

/// Fixed `scale x scale` sensing grid in the humanoid's heading frame.
#[derive(Clone, Debug)]
pub struct LocalGrid {
    /// Offsets of each grid point from the humanoid, heading frame, row-major over y.
    pub offsets: Vec<[f64; 2]>,
}

impl LocalGrid {
    /// The humanoid sits a quarter of the way along x and halfway along y, so
    /// the grid mostly looks ahead.
    pub fn new(scale: usize, interval: f64) -> Self {
        let span = interval * (scale as f64 - 1.0);
        let anchor = [span / 4.0, span / 2.0];
        let mut offsets = Vec::with_capacity(scale * scale);
        for j in 0..scale {
            for i in 0..scale {
                offsets.push([
                    i as f64 * interval - anchor[0],
                    j as f64 * interval - anchor[1],
                ]);
            }
        }
        Self { offsets }
    }

    /// Sample `map` at every grid point, rotated by the root heading and
    /// placed around `root_local` (root position in the scene's own frame).
    pub fn crop_into(
        &self,
        map: &HeightMap,
        root_local: [f64; 3],
        root_rot: &UnitQuaternion<f64>,
        tolerance_sq: f64,
        out: &mut Vec<f64>,
    ) {
        let heading = heading_quat(root_rot);
        out.extend(self.offsets.iter().map(|o| {
            let r = heading * Vector3::new(o[0], o[1], 0.0);
            map.height_at([root_local[0] + r.x, root_local[1] + r.y], tolerance_sq)
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn floor_with_box() -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for i in 0..=40 {
            for j in 0..=40 {
                let x = i as f64 * 0.1;
                let y = j as f64 * 0.1;
                let z = if (1.0..=2.0).contains(&x) && (1.0..=2.0).contains(&y) {
                    0.5
                } else {
                    0.0
                };
                points.push([x, y, z]);
            }
        }
        points
    }

    #[test]
    fn build_produces_dense_grid() {
        let map = HeightMap::build(&floor_with_box(), 20, 1.5);
        assert_eq!(map.samples.len(), 400);
        assert_eq!(map.samples[0][0], 0.0);
        assert_eq!(map.samples[19][0], 4.0);
        assert_eq!(map.samples[20][1], map.samples[21][1]);
    }

    #[test]
    fn build_takes_max_height_per_cell() {
        let map = HeightMap::build(&floor_with_box(), 20, 1.5);
        let max = map.samples.iter().map(|s| s[2]).fold(0.0, f64::max);
        assert_eq!(max, 0.5);
    }

    #[test]
    fn points_above_ceiling_are_zeroed() {
        let mut points = floor_with_box();
        points.push([3.05, 3.05, 2.4]);
        let map = HeightMap::build(&points, 20, 1.5);
        assert!(map.samples.iter().all(|s| s[2] <= 0.5));
    }

    #[test]
    fn negative_heights_clamp_to_zero() {
        let points = vec![[0.0, 0.0, -0.3], [1.0, 1.0, -0.2]];
        let map = HeightMap::build(&points, 4, 1.5);
        assert!(map.samples.iter().all(|s| s[2] == 0.0));
    }

    #[test]
    fn build_is_idempotent() {
        let points = floor_with_box();
        let a = HeightMap::build(&points, 25, 1.5);
        let b = HeightMap::build(&points, 25, 1.5);
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn local_grid_anchor_sits_inside_grid() {
        let grid = LocalGrid::new(9, 0.2);
        assert_eq!(grid.offsets.len(), 81);
        let origin = grid
            .offsets
            .iter()
            .position(|o| o[0].abs() < 1e-12 && o[1].abs() < 1e-12);
        assert_eq!(origin, Some(4 * 9 + 2));
    }

    #[test]
    fn crop_reads_box_ahead_of_humanoid() {
        let map = HeightMap::build(&floor_with_box(), 40, 1.5);
        let grid = LocalGrid::new(9, 0.2);
        let mut out = Vec::new();
        grid.crop_into(
            &map,
            [0.5, 1.5, 0.9],
            &UnitQuaternion::identity(),
            0.05,
            &mut out,
        );
        assert_eq!(out.len(), 81);
        // Row through the humanoid: x offsets -0.4..1.2 from x = 0.5.
        let row: Vec<f64> = out[4 * 9..5 * 9].to_vec();
        assert_eq!(row[0], 0.0);
        assert_eq!(row[8], 0.5);
    }

    #[test]
    fn crop_rotates_with_heading() {
        let map = HeightMap::build(&floor_with_box(), 40, 1.5);
        let grid = LocalGrid::new(9, 0.2);
        let facing_away = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI);
        let mut out = Vec::new();
        grid.crop_into(&map, [0.5, 1.5, 0.9], &facing_away, 0.05, &mut out);
        assert!(out.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn crop_outside_scene_reads_zero() {
        let map = HeightMap::build(&floor_with_box(), 40, 1.5);
        let grid = LocalGrid::new(9, 0.2);
        let mut out = Vec::new();
        grid.crop_into(
            &map,
            [50.0, 50.0, 0.9],
            &UnitQuaternion::identity(),
            0.05,
            &mut out,
        );
        assert!(out.iter().all(|&h| h == 0.0));
    }
}
