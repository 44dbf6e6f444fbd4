//! Per-scene vertices and segmentation, loaded from pre-exported JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::{error::Error, fmt, fs};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::plan::PlanSet;
use crate::segmentation::{Aggregation, SegmentGroup, SegmentIndices};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneAssets {
    pub vertices: Vec<[f64; 3]>,
    pub seg_indices: Vec<i64>,
    pub seg_groups: Vec<SegmentGroup>,
}

/// Assets keyed by scene id.
pub type AssetSet = BTreeMap<String, SceneAssets>;

#[derive(Debug)]
pub enum AssetError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            AssetError::Parse { path, source } => {
                write!(f, "{}: invalid JSON: {source}", path.display())
            }
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            AssetError::Parse { source, .. } => Some(source),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, AssetError> {
    let text = fs::read_to_string(&path).map_err(|source| AssetError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AssetError::Parse { path, source })
}

impl SceneAssets {
    /// Load `scene<id>_vertices.json`, `scene<id>_vh_clean_2.0.010000.segs.json`
    /// and `scene<id>_vh_clean.aggregation.json` from `dir`.
    pub fn load(dir: &Path, scene_id: &str) -> Result<Self, AssetError> {
        let vertices: Vec<[f64; 3]> = read_json(dir.join(format!("scene{scene_id}_vertices.json")))?;
        let segs: SegmentIndices = read_json(
            dir.join(format!("scene{scene_id}_vh_clean_2.0.010000.segs.json")),
        )?;
        let aggregation: Aggregation =
            read_json(dir.join(format!("scene{scene_id}_vh_clean.aggregation.json")))?;
        info!(
            scene_id,
            vertices = vertices.len(),
            groups = aggregation.seg_groups.len(),
            "loaded scene assets"
        );
        Ok(Self {
            vertices,
            seg_indices: segs.seg_indices,
            seg_groups: aggregation.seg_groups,
        })
    }
}

/// Load every scene referenced by `plans` once.
pub fn load_for_plans(dir: &Path, plans: &PlanSet) -> Result<AssetSet, AssetError> {
    let scene_ids: BTreeSet<&str> = plans.values().map(|p| p.scene_id.as_str()).collect();
    scene_ids
        .into_iter()
        .map(|id| Ok((id.to_string(), SceneAssets::load(dir, id)?)))
        .collect()
}
