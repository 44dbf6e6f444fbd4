//! Over-segmentation data that labels each scene vertex, and resolution of
//! named object parts to point subsets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Per-vertex segment ids (`*_vh_clean_2.0.010000.segs.json`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SegmentIndices {
    #[serde(rename = "segIndices")]
    pub seg_indices: Vec<i64>,
}

/// One annotated object: the segment ids it owns (`*.aggregation.json`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SegmentGroup {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
    pub segments: Vec<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Aggregation {
    #[serde(rename = "segGroups")]
    pub seg_groups: Vec<SegmentGroup>,
}

/// Segment ids of `group` selected by positional `part_indices`.
/// Returns the first out-of-range position on failure.
pub fn part_segments(group: &SegmentGroup, part_indices: &[usize]) -> Result<Vec<i64>, usize> {
    part_indices
        .iter()
        .map(|&i| group.segments.get(i).copied().ok_or(i))
        .collect()
}

/// Points whose segment id is any of `segments` (multi-segment union).
pub fn select_points(
    vertices: &[[f64; 3]],
    seg_indices: &[i64],
    segments: &[i64],
) -> Vec<[f64; 3]> {
    let wanted: BTreeSet<i64> = segments.iter().copied().collect();
    vertices
        .iter()
        .zip(seg_indices)
        .filter(|(_, seg)| wanted.contains(seg))
        .map(|(v, _)| *v)
        .collect()
}
