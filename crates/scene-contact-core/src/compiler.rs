//! Compiles authored plans into dense per-step tables shared read-only by
//! every environment.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::assets::AssetSet;
use crate::config::EnvConfig;
use crate::constants::{JOINT_NUM, MAX_STEP_POOL, POINTS_PER_PART};
use crate::heightmap::HeightMap;
use crate::plan::{Constraint, ConstraintTarget, PlanError, PlanSet, PlanSpec, Relation};
use crate::scene::SceneTransform;
use crate::segmentation;

/// Constraint data of one plan step, one entry per joint slot.
#[derive(Clone, Debug, PartialEq)]
pub struct StepTable {
    pub stand_point: [f64; 3],
    pub contact_type: [bool; JOINT_NUM],
    pub contact_valid: [bool; JOINT_NUM],
    pub contact_direction: [[f64; 3]; JOINT_NUM],
    pub joint_pairs: [usize; JOINT_NUM],
    pub joint_pairs_valid: [bool; JOINT_NUM],
    /// `JOINT_NUM * POINTS_PER_PART` points, slot-major; zeros for slots without a part.
    pub part_points: Vec<[f64; 3]>,
    /// Human-readable constraint list, for logging step transitions.
    pub description: Vec<String>,
}

impl Default for StepTable {
    fn default() -> Self {
        Self {
            stand_point: [0.0; 3],
            contact_type: [false; JOINT_NUM],
            contact_valid: [false; JOINT_NUM],
            contact_direction: [[0.0; 3]; JOINT_NUM],
            joint_pairs: [0; JOINT_NUM],
            joint_pairs_valid: [false; JOINT_NUM],
            part_points: vec![[0.0; 3]; JOINT_NUM * POINTS_PER_PART],
            description: Vec::new(),
        }
    }
}

impl StepTable {
    pub fn slot_points(&self, slot: usize) -> &[[f64; 3]] {
        &self.part_points[slot * POINTS_PER_PART..(slot + 1) * POINTS_PER_PART]
    }
}

#[derive(Clone, Debug)]
pub struct CompiledPlan {
    pub name: String,
    pub scene_id: String,
    pub init_pos: [f64; 2],
    /// Number of authored steps; `steps[max_steps..]` are padding.
    pub max_steps: usize,
    /// Always `MAX_STEP_POOL` long.
    pub steps: Vec<StepTable>,
    pub heightmap: HeightMap,
}

impl CompiledPlan {
    pub fn step(&self, step_mode: usize) -> &StepTable {
        &self.steps[step_mode.min(MAX_STEP_POOL - 1)]
    }
}

/// Compiled plans indexed by plan id (sorted plan-name order).
#[derive(Clone, Debug)]
pub struct PlanTables {
    pub plans: Vec<CompiledPlan>,
}

impl PlanTables {
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Part label mapping of one object: part name to the segment ids it covers.
struct ObjectLabels {
    parts: BTreeMap<String, Vec<i64>>,
}

pub fn compile_plans<R: Rng + ?Sized>(
    plans: &PlanSet,
    assets: &AssetSet,
    config: &EnvConfig,
    rng: &mut R,
) -> Result<PlanTables, PlanError> {
    if plans.is_empty() {
        return Err(PlanError::NoPlans);
    }
    let compiled = plans
        .iter()
        .map(|(name, spec)| compile_plan(name, spec, assets, config, rng))
        .collect::<Result<Vec<_>, _>>()?;
    info!(plans = compiled.len(), "compiled plan tables");
    Ok(PlanTables { plans: compiled })
}

fn compile_plan<R: Rng + ?Sized>(
    name: &str,
    spec: &PlanSpec,
    assets: &AssetSet,
    config: &EnvConfig,
    rng: &mut R,
) -> Result<CompiledPlan, PlanError> {
    let scene = assets
        .get(&spec.scene_id)
        .ok_or_else(|| PlanError::MissingScene {
            plan: name.to_string(),
            scene_id: spec.scene_id.clone(),
        })?;
    if scene.vertices.is_empty() {
        return Err(PlanError::EmptyScene {
            scene_id: spec.scene_id.clone(),
        });
    }
    if scene.vertices.len() != scene.seg_indices.len() {
        return Err(PlanError::AssetLengthMismatch {
            scene_id: spec.scene_id.clone(),
            vertices: scene.vertices.len(),
            labels: scene.seg_indices.len(),
        });
    }

    let init_pos = spec.init_xy(name)?;
    let steps = spec.parse_steps(name)?;
    let vertices = SceneTransform::from_plan(spec).apply(&scene.vertices);
    let labels = object_labels(name, spec, &scene.seg_groups)?;

    let mut tables = vec![StepTable::default(); MAX_STEP_POOL];
    let mut constraint_count = 0usize;
    for (table, constraints) in tables.iter_mut().zip(&steps) {
        constraint_count += constraints.len();
        for c in constraints {
            fill_constraint(
                name,
                spec,
                c,
                &labels,
                &vertices,
                &scene.seg_indices,
                config,
                table,
                rng,
            )?;
        }
        for slot in 0..JOINT_NUM {
            table.contact_valid[slot] |= table.joint_pairs_valid[slot];
            table.contact_type[slot] |= table.joint_pairs_valid[slot];
        }
    }

    let heightmap = HeightMap::build(&vertices, config.height_map_dim, config.height_ceiling);
    info!(
        plan = name,
        scene_id = %spec.scene_id,
        steps = steps.len(),
        constraints = constraint_count,
        "compiled plan"
    );
    Ok(CompiledPlan {
        name: name.to_string(),
        scene_id: spec.scene_id.clone(),
        init_pos,
        max_steps: steps.len(),
        steps: tables,
        heightmap,
    })
}

fn object_labels(
    plan: &str,
    spec: &PlanSpec,
    groups: &[segmentation::SegmentGroup],
) -> Result<BTreeMap<String, ObjectLabels>, PlanError> {
    let mut out = BTreeMap::new();
    for (key, obj) in &spec.obj {
        let item = format!("{}{}", obj.name, key);
        let group_idx = obj.id.resolve().ok_or_else(|| PlanError::InvalidGroupId {
            plan: plan.to_string(),
            object: item.clone(),
        })?;
        let group = groups.get(group_idx).ok_or_else(|| PlanError::GroupOutOfRange {
            plan: plan.to_string(),
            object: item.clone(),
            group: group_idx,
        })?;
        let mut parts = BTreeMap::new();
        for (part, indices) in &obj.part_id {
            let segments = segmentation::part_segments(group, indices).map_err(|index| {
                PlanError::PartIndexOutOfRange {
                    plan: plan.to_string(),
                    object: item.clone(),
                    part: part.clone(),
                    index,
                }
            })?;
            parts.insert(part.clone(), segments);
        }
        out.insert(item, ObjectLabels { parts });
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn fill_constraint<R: Rng + ?Sized>(
    plan: &str,
    spec: &PlanSpec,
    c: &Constraint,
    labels: &BTreeMap<String, ObjectLabels>,
    vertices: &[[f64; 3]],
    seg_indices: &[i64],
    config: &EnvConfig,
    table: &mut StepTable,
    rng: &mut R,
) -> Result<(), PlanError> {
    // The last constraint listed decides the step's stand point.
    table.stand_point = spec
        .obj
        .get(c.object_key())
        .and_then(|o| o.stand_point.first().copied())
        .unwrap_or([0.0; 3]);
    table.description.push(describe(c));

    let Some(slot) = c.joint else {
        return Ok(());
    };
    match &c.target {
        ConstraintTarget::StandOnly => {}
        ConstraintTarget::Part(part) => {
            let segments = labels
                .get(&c.object_ref)
                .and_then(|o| o.parts.get(part))
                .ok_or_else(|| PlanError::UnknownPart {
                    plan: plan.to_string(),
                    object: c.object_ref.clone(),
                    part: part.clone(),
                })?;
            let points = segmentation::select_points(vertices, seg_indices, segments);
            if points.is_empty() {
                return Err(PlanError::EmptyPart {
                    plan: plan.to_string(),
                    object: c.object_ref.clone(),
                    part: part.clone(),
                });
            }
            if points.len() < POINTS_PER_PART {
                warn!(
                    plan,
                    object = %c.object_ref,
                    part = %part,
                    points = points.len(),
                    "part has fewer points than samples; points will repeat"
                );
            }
            let sampled =
                crate::sampler::sample_part(&points, POINTS_PER_PART, config.edge_margin, rng);
            debug!(
                plan,
                part = %part,
                raw = points.len(),
                slot,
                "sampled part points"
            );
            table.part_points[slot * POINTS_PER_PART..(slot + 1) * POINTS_PER_PART]
                .copy_from_slice(&sampled);
            table.contact_type[slot] = c.relation == Relation::Contact;
            table.contact_valid[slot] = true;
            table.contact_direction[slot] = c.direction.vector();
        }
        ConstraintTarget::Joint(other) => {
            table.joint_pairs[slot] = *other;
            table.joint_pairs_valid[slot] = true;
            table.contact_direction[slot] = c.direction.vector();
        }
    }
    Ok(())
}

fn describe(c: &Constraint) -> String {
    let target = match &c.target {
        ConstraintTarget::StandOnly => "none".to_string(),
        ConstraintTarget::Part(p) => p.clone(),
        ConstraintTarget::Joint(j) => crate::joints::JOINT_NAMES[*j].to_string(),
    };
    let joint = c.joint.map_or("none", |j| crate::joints::JOINT_NAMES[j]);
    format!(
        "{} {} {} {:?} {:?}",
        c.object_ref, target, joint, c.relation, c.direction
    )
}
