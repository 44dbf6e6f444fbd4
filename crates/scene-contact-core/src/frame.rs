//! Per-tick data exchanged with the physics engine.

use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

use crate::metrics::StepMetrics;

/// Simulator state after physics for one tick. Per-body arrays are env-major:
/// body `b` of env `e` is at `e * num_bodies + b`.
#[derive(Clone, Debug, Default)]
pub struct SimFrame {
    pub num_bodies: usize,
    pub root_pos: Vec<[f64; 3]>,
    /// Root orientation, `[x, y, z, w]`.
    pub root_rot: Vec<[f64; 4]>,
    pub body_pos: Vec<[f64; 3]>,
    pub body_rot: Vec<[f64; 4]>,
    pub body_vel: Vec<[f64; 3]>,
    pub contact_forces: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    RootCount { expected: usize, actual: usize },
    BodyCount { expected: usize, actual: usize },
    TooFewBodies { required: usize, actual: usize },
    FlatLength { field: &'static str, stride: usize, actual: usize },
    EnvIdOutOfRange { env_id: usize, num_envs: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::RootCount { expected, actual } => {
                write!(f, "expected {expected} root states, got {actual}")
            }
            FrameError::BodyCount { expected, actual } => {
                write!(f, "expected {expected} body entries per field, got {actual}")
            }
            FrameError::TooFewBodies { required, actual } => {
                write!(f, "frame has {actual} bodies per env, at least {required} required")
            }
            FrameError::FlatLength {
                field,
                stride,
                actual,
            } => write!(f, "{field}: length {actual} is not a multiple of {stride}"),
            FrameError::EnvIdOutOfRange { env_id, num_envs } => {
                write!(f, "env id {env_id} out of range for {num_envs} envs")
            }
        }
    }
}

impl Error for FrameError {}

fn chunk<const N: usize>(field: &'static str, flat: &[f64]) -> Result<Vec<[f64; N]>, FrameError> {
    if flat.len() % N != 0 {
        return Err(FrameError::FlatLength {
            field,
            stride: N,
            actual: flat.len(),
        });
    }
    Ok(flat
        .chunks_exact(N)
        .map(|c| {
            let mut out = [0.0; N];
            out.copy_from_slice(c);
            out
        })
        .collect())
}

impl SimFrame {
    /// Build a frame from flat buffers: root states as `[x, y, z, qx, qy, qz, qw]`
    /// per env, positions/velocities/forces as 3 values per body, rotations as 4.
    pub fn from_flat(
        num_envs: usize,
        root_states: &[f64],
        body_pos: &[f64],
        body_rot: &[f64],
        body_vel: &[f64],
        contact_forces: &[f64],
    ) -> Result<Self, FrameError> {
        let roots: Vec<[f64; 7]> = chunk("root_states", root_states)?;
        let body_pos = chunk::<3>("body_pos", body_pos)?;
        let num_bodies = if num_envs == 0 {
            0
        } else {
            body_pos.len() / num_envs
        };
        let frame = Self {
            num_bodies,
            root_pos: roots.iter().map(|r| [r[0], r[1], r[2]]).collect(),
            root_rot: roots.iter().map(|r| [r[3], r[4], r[5], r[6]]).collect(),
            body_pos,
            body_rot: chunk("body_rot", body_rot)?,
            body_vel: chunk("body_vel", body_vel)?,
            contact_forces: chunk("contact_forces", contact_forces)?,
        };
        Ok(frame)
    }

    /// Check shapes against a batch of `num_envs` envs needing `min_bodies` bodies each.
    pub fn validate(&self, num_envs: usize, min_bodies: usize) -> Result<(), FrameError> {
        for len in [self.root_pos.len(), self.root_rot.len()] {
            if len != num_envs {
                return Err(FrameError::RootCount {
                    expected: num_envs,
                    actual: len,
                });
            }
        }
        if self.num_bodies < min_bodies {
            return Err(FrameError::TooFewBodies {
                required: min_bodies,
                actual: self.num_bodies,
            });
        }
        let expected = num_envs * self.num_bodies;
        for len in [
            self.body_pos.len(),
            self.body_rot.len(),
            self.body_vel.len(),
            self.contact_forces.len(),
        ] {
            if len != expected {
                return Err(FrameError::BodyCount {
                    expected,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    pub fn bodies<'a, T>(&self, field: &'a [T], env: usize) -> &'a [T] {
        &field[env * self.num_bodies..(env + 1) * self.num_bodies]
    }
}

/// Per-tick outputs for the training loop.
#[derive(Clone, Debug, Default)]
pub struct StepOutput {
    /// `num_envs * observation_size` values, env-major.
    pub observations: Vec<f64>,
    pub rewards: Vec<f64>,
    pub resets: Vec<bool>,
    pub terminated: Vec<bool>,
    pub metrics: StepMetrics,
}

/// Pose the engine should apply to an env's humanoid root after a reset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPose {
    pub env_id: usize,
    pub position: [f64; 3],
    /// `[x, y, z, w]`.
    pub rotation: [f64; 4],
}
