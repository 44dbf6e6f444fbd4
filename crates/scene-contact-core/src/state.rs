//! Mutable per-environment buffers. Each vector has one entry per env; the
//! shared plan tables are never written after construction.

use crate::compiler::{CompiledPlan, StepTable};
use crate::constants::{JOINT_NUM, POINTS_PER_PART};

#[derive(Clone, Debug)]
pub struct EnvironmentBatchState {
    pub plan_id: Vec<usize>,
    pub step_mode: Vec<usize>,
    /// Ticks since the last reset.
    pub progress: Vec<usize>,

    // Active step, shifted into each env's frame.
    pub stand_point: Vec<[f64; 3]>,
    pub contact_type: Vec<[bool; JOINT_NUM]>,
    pub contact_valid: Vec<[bool; JOINT_NUM]>,
    pub contact_direction: Vec<[[f64; 3]; JOINT_NUM]>,
    pub joint_pairs: Vec<[usize; JOINT_NUM]>,
    pub joint_pairs_valid: Vec<[bool; JOINT_NUM]>,
    /// `JOINT_NUM * POINTS_PER_PART` points per env, slot-major.
    pub part_points: Vec<Vec<[f64; 3]>>,

    // Written by the reward pass, read by the next observation and reset passes.
    pub location_diff: Vec<f64>,
    pub joint_diff: Vec<[f64; JOINT_NUM]>,
    pub joint_idx: Vec<[usize; JOINT_NUM]>,
    pub tar_dir: Vec<[f64; 2]>,

    /// Keypoint-corrected joint positions of the current tick.
    pub joint_pos: Vec<[[f64; 3]; JOINT_NUM]>,
    pub prev_root_pos: Vec<[f64; 3]>,

    pub still_count: Vec<u32>,
    pub big_force: Vec<bool>,
    pub fulfilled: Vec<bool>,
    pub reset: Vec<bool>,
    pub terminated: Vec<bool>,
}

impl EnvironmentBatchState {
    pub fn new(plan_id: Vec<usize>) -> Self {
        let n = plan_id.len();
        Self {
            plan_id,
            step_mode: vec![0; n],
            progress: vec![0; n],
            stand_point: vec![[0.0; 3]; n],
            contact_type: vec![[false; JOINT_NUM]; n],
            contact_valid: vec![[false; JOINT_NUM]; n],
            contact_direction: vec![[[0.0; 3]; JOINT_NUM]; n],
            joint_pairs: vec![[0; JOINT_NUM]; n],
            joint_pairs_valid: vec![[false; JOINT_NUM]; n],
            part_points: vec![vec![[0.0; 3]; JOINT_NUM * POINTS_PER_PART]; n],
            location_diff: vec![0.0; n],
            joint_diff: vec![[1.0; JOINT_NUM]; n],
            joint_idx: vec![[0; JOINT_NUM]; n],
            tar_dir: vec![[0.0; 2]; n],
            joint_pos: vec![[[0.0; 3]; JOINT_NUM]; n],
            prev_root_pos: vec![[0.0; 3]; n],
            still_count: vec![0; n],
            big_force: vec![false; n],
            fulfilled: vec![false; n],
            reset: vec![false; n],
            terminated: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.plan_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plan_id.is_empty()
    }

    /// Copy the active step of `plan` into env `env`, shifted by `offset`.
    pub fn load_step(&mut self, env: usize, plan: &CompiledPlan, offset: [f64; 2]) {
        let step: &StepTable = plan.step(self.step_mode[env]);
        let shift = |p: [f64; 3]| [p[0] + offset[0], p[1] + offset[1], p[2]];
        self.stand_point[env] = shift(step.stand_point);
        self.contact_type[env] = step.contact_type;
        self.contact_valid[env] = step.contact_valid;
        self.contact_direction[env] = step.contact_direction;
        self.joint_pairs[env] = step.joint_pairs;
        self.joint_pairs_valid[env] = step.joint_pairs_valid;
        for (dst, src) in self.part_points[env].iter_mut().zip(&step.part_points) {
            *dst = shift(*src);
        }
    }

    /// Whether env `env` has any valid contact constraint (contact mode).
    pub fn not_walking(&self, env: usize) -> bool {
        self.contact_valid[env].iter().any(|v| *v)
    }

    /// Target points of `slot`: the sampled part, or the paired joint's
    /// current position for joint-pair slots.
    pub fn slot_targets(&self, env: usize, slot: usize) -> SlotTargets<'_> {
        if self.joint_pairs_valid[env][slot] {
            SlotTargets::Joint(self.joint_pos[env][self.joint_pairs[env][slot]])
        } else {
            SlotTargets::Points(
                &self.part_points[env][slot * POINTS_PER_PART..(slot + 1) * POINTS_PER_PART],
            )
        }
    }
}

/// Points a joint slot is measured against.
#[derive(Clone, Copy, Debug)]
pub enum SlotTargets<'a> {
    Points(&'a [[f64; 3]]),
    /// Every candidate point collapses onto one joint position.
    Joint([f64; 3]),
}

impl SlotTargets<'_> {
    pub fn point(&self, idx: usize) -> [f64; 3] {
        match self {
            SlotTargets::Points(points) => points[idx.min(points.len().saturating_sub(1))],
            SlotTargets::Joint(p) => *p,
        }
    }

    /// Nearest candidate to `from`: `(index, squared distance)`. First minimum wins.
    pub fn nearest(&self, from: [f64; 3]) -> (usize, f64) {
        let dist2 = |p: &[f64; 3]| {
            let dx = p[0] - from[0];
            let dy = p[1] - from[1];
            let dz = p[2] - from[2];
            dx * dx + dy * dy + dz * dz
        };
        match self {
            SlotTargets::Points(points) => points.iter().enumerate().fold(
                (0, f64::INFINITY),
                |best, (i, p)| {
                    let d = dist2(p);
                    if d < best.1 {
                        (i, d)
                    } else {
                        best
                    }
                },
            ),
            SlotTargets::Joint(p) => (0, dist2(p)),
        }
    }
}
