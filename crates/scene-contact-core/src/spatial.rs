use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Planar position of one heightmap cell plus its height.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightSample {
    pub index: usize,
    pub position: [f64; 2],
    pub height: f64,
}

impl RTreeObject for HeightSample {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for HeightSample {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Build an R*-tree over `(x, y, height)` samples via bulk_load (O(n log n)).
pub fn build_height_index(samples: &[[f64; 3]]) -> RTree<HeightSample> {
    let entries: Vec<HeightSample> = samples
        .iter()
        .enumerate()
        .map(|(index, s)| HeightSample {
            index,
            position: [s[0], s[1]],
            height: s[2],
        })
        .collect();
    RTree::bulk_load(entries)
}

/// Height of the sample nearest to `query` in the plane, or 0 when that
/// sample's squared distance is not below `tolerance_sq`.
pub fn lookup_height(tree: &RTree<HeightSample>, query: [f64; 2], tolerance_sq: f64) -> f64 {
    match tree.nearest_neighbor(&query) {
        Some(sample) if sample.distance_2(&query) < tolerance_sq => sample.height,
        _ => 0.0,
    }
}
