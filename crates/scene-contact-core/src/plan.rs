//! Authored interaction plans: the JSON model and its parsing into typed
//! constraints.

use std::collections::BTreeMap;
use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

use crate::constants::MAX_STEP_POOL;
use crate::joints::{self, Direction};

/// Plans keyed by plan name. Iteration order (and so plan ids) is sorted by name.
pub type PlanSet = BTreeMap<String, PlanSpec>;

/// Segmentation group reference; plan files carry it as a string or an integer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GroupId {
    Index(usize),
    Text(String),
}

impl GroupId {
    pub fn resolve(&self) -> Option<usize> {
        match self {
            GroupId::Index(i) => Some(*i),
            GroupId::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ObjectSpec {
    pub id: GroupId,
    pub name: String,
    /// Part name to positions in the group's `segments` list.
    #[serde(default)]
    pub part_id: BTreeMap<String, Vec<usize>>,
    #[serde(default)]
    pub stand_point: Vec<[f64; 3]>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanSpec {
    pub scene_id: String,
    #[serde(default)]
    pub rotate: Vec<[f64; 3]>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub transfer: [f64; 3],
    pub init_pos: Vec<f64>,
    /// Objects keyed by a short id; constraints refer to `name + key`.
    pub obj: BTreeMap<String, ObjectSpec>,
    /// Steps in order, each a list of `[object, part_or_joint, joint, relation, direction]`.
    pub contact_pairs: Vec<Vec<Vec<String>>>,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Contact,
    NoContact,
}

impl Relation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "contact" => Some(Relation::Contact),
            "not_contact" | "no_contact" | "no-contact" | "noncontact" => {
                Some(Relation::NoContact)
            }
            _ => None,
        }
    }
}

/// What a constraint asks the target joint to reach.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintTarget {
    /// Navigation only: contributes the object's stand point.
    StandOnly,
    /// A named part of the referenced object.
    Part(String),
    /// Another joint of the same humanoid.
    Joint(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub object_ref: String,
    pub target: ConstraintTarget,
    /// Joint slot the constraint applies to; `None` for stand-only constraints.
    pub joint: Option<usize>,
    pub relation: Relation,
    pub direction: Direction,
}

impl Constraint {
    /// Object key the stand point is read from: the last three characters of the reference.
    pub fn object_key(&self) -> &str {
        let start = self
            .object_ref
            .char_indices()
            .rev()
            .nth(2)
            .map_or(0, |(i, _)| i);
        &self.object_ref[start..]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    NoPlans,
    EmptyPlan { plan: String },
    TooManySteps { plan: String, max: usize, actual: usize },
    MalformedConstraint { plan: String, step: usize, len: usize },
    UnknownJoint { plan: String, name: String },
    UnknownDirection { plan: String, name: String },
    UnknownRelation { plan: String, name: String },
    UnknownObject { plan: String, reference: String },
    UnknownPart { plan: String, object: String, part: String },
    InvalidGroupId { plan: String, object: String },
    GroupOutOfRange { plan: String, object: String, group: usize },
    PartIndexOutOfRange { plan: String, object: String, part: String, index: usize },
    EmptyPart { plan: String, object: String, part: String },
    InvalidInitPos { plan: String },
    MissingScene { plan: String, scene_id: String },
    EmptyScene { scene_id: String },
    AssetLengthMismatch { scene_id: String, vertices: usize, labels: usize },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::NoPlans => write!(f, "plan set is empty"),
            PlanError::EmptyPlan { plan } => write!(f, "plan '{plan}' has no steps"),
            PlanError::TooManySteps { plan, max, actual } => {
                write!(f, "plan '{plan}' has {actual} steps, max {max}")
            }
            PlanError::MalformedConstraint { plan, step, len } => write!(
                f,
                "plan '{plan}' step {step}: constraint has {len} fields, expected 5"
            ),
            PlanError::UnknownJoint { plan, name } => {
                write!(f, "plan '{plan}': unknown joint '{name}'")
            }
            PlanError::UnknownDirection { plan, name } => {
                write!(f, "plan '{plan}': unknown direction '{name}'")
            }
            PlanError::UnknownRelation { plan, name } => {
                write!(f, "plan '{plan}': unknown relation '{name}'")
            }
            PlanError::UnknownObject { plan, reference } => {
                write!(f, "plan '{plan}': unknown object reference '{reference}'")
            }
            PlanError::UnknownPart { plan, object, part } => {
                write!(f, "plan '{plan}': object '{object}' has no part '{part}'")
            }
            PlanError::InvalidGroupId { plan, object } => {
                write!(f, "plan '{plan}': object '{object}' has a non-numeric id")
            }
            PlanError::GroupOutOfRange {
                plan,
                object,
                group,
            } => write!(
                f,
                "plan '{plan}': object '{object}' references missing segment group {group}"
            ),
            PlanError::PartIndexOutOfRange {
                plan,
                object,
                part,
                index,
            } => write!(
                f,
                "plan '{plan}': part '{part}' of '{object}' references missing segment {index}"
            ),
            PlanError::EmptyPart { plan, object, part } => {
                write!(f, "plan '{plan}': part '{part}' of '{object}' has no points")
            }
            PlanError::InvalidInitPos { plan } => {
                write!(f, "plan '{plan}': init_pos needs at least x and y")
            }
            PlanError::MissingScene { plan, scene_id } => {
                write!(f, "plan '{plan}': no assets for scene '{scene_id}'")
            }
            PlanError::EmptyScene { scene_id } => write!(f, "scene '{scene_id}' has no vertices"),
            PlanError::AssetLengthMismatch {
                scene_id,
                vertices,
                labels,
            } => write!(
                f,
                "scene '{scene_id}': {vertices} vertices but {labels} segment labels"
            ),
        }
    }
}

impl Error for PlanError {}

impl PlanSpec {
    pub fn init_xy(&self, plan: &str) -> Result<[f64; 2], PlanError> {
        match self.init_pos.as_slice() {
            [x, y, ..] => Ok([*x, *y]),
            _ => Err(PlanError::InvalidInitPos {
                plan: plan.to_string(),
            }),
        }
    }

    /// Item names (`name + key`) mapped to their object keys.
    pub fn object_refs(&self) -> BTreeMap<String, String> {
        self.obj
            .iter()
            .map(|(key, obj)| (format!("{}{}", obj.name, key), key.clone()))
            .collect()
    }

    /// Parse every step into typed constraints, failing on the first
    /// authoring error.
    pub fn parse_steps(&self, plan: &str) -> Result<Vec<Vec<Constraint>>, PlanError> {
        if self.contact_pairs.is_empty() {
            return Err(PlanError::EmptyPlan {
                plan: plan.to_string(),
            });
        }
        if self.contact_pairs.len() > MAX_STEP_POOL {
            return Err(PlanError::TooManySteps {
                plan: plan.to_string(),
                max: MAX_STEP_POOL,
                actual: self.contact_pairs.len(),
            });
        }
        let refs = self.object_refs();
        self.contact_pairs
            .iter()
            .enumerate()
            .map(|(step, raw)| {
                raw.iter()
                    .map(|fields| parse_constraint(plan, step, fields, &refs, self))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

fn parse_constraint(
    plan: &str,
    step: usize,
    fields: &[String],
    refs: &BTreeMap<String, String>,
    spec: &PlanSpec,
) -> Result<Constraint, PlanError> {
    let [object_ref, part, joint, relation, direction] = fields else {
        return Err(PlanError::MalformedConstraint {
            plan: plan.to_string(),
            step,
            len: fields.len(),
        });
    };
    let Some(key) = refs.get(object_ref) else {
        return Err(PlanError::UnknownObject {
            plan: plan.to_string(),
            reference: object_ref.clone(),
        });
    };
    if part == "none" {
        return Ok(Constraint {
            object_ref: object_ref.clone(),
            target: ConstraintTarget::StandOnly,
            joint: None,
            relation: Relation::NoContact,
            direction: Direction::None,
        });
    }

    let relation = Relation::parse(relation).ok_or_else(|| PlanError::UnknownRelation {
        plan: plan.to_string(),
        name: relation.clone(),
    })?;
    let direction = Direction::parse(direction).ok_or_else(|| PlanError::UnknownDirection {
        plan: plan.to_string(),
        name: direction.clone(),
    })?;

    let joint_slot = joints::joint_index(joint).ok_or_else(|| PlanError::UnknownJoint {
        plan: plan.to_string(),
        name: joint.clone(),
    })?;
    let target = match joints::joint_index(part) {
        Some(other) => ConstraintTarget::Joint(other),
        None => {
            let known = spec
                .obj
                .get(key)
                .is_some_and(|obj| obj.part_id.contains_key(part));
            if !known {
                return Err(PlanError::UnknownPart {
                    plan: plan.to_string(),
                    object: object_ref.clone(),
                    part: part.clone(),
                });
            }
            ConstraintTarget::Part(part.clone())
        }
    };
    Ok(Constraint {
        object_ref: object_ref.clone(),
        target,
        joint: Some(joint_slot),
        relation,
        direction,
    })
}

/// Parse a JSON plan file.
pub fn parse_plan_set(json: &str) -> Result<PlanSet, serde_json::Error> {
    serde_json::from_str(json)
}
