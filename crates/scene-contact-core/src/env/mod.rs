use crate::assets::AssetSet;
use crate::compiler::{self, PlanTables};
use crate::config::{EnvConfig, EnvConfigError};
use crate::constants::JOINT_NUM;
use crate::frame::{FrameError, SimFrame, SpawnPose, StepOutput};
use crate::heightmap::LocalGrid;
use crate::layout::SceneLayout;
use crate::metrics::{ResetStats, StepMetrics};
use crate::plan::{PlanError, PlanSet};
use crate::rng::{derive_rng, RngStream};
use crate::state::EnvironmentBatchState;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};
use tracing::info;

mod phases;

#[cfg(test)]
mod tests;

/// Batched scene-contact environment: plan tables shared by every env plus
/// the per-env progress state.
pub struct ContactEnv {
    config: EnvConfig,
    tables: PlanTables,
    layout: SceneLayout,
    state: EnvironmentBatchState,
    local_grid: LocalGrid,
    facing_slots: Vec<usize>,
    min_bodies: usize,
    spawn_rng: ChaCha12Rng,
    tick: usize,
    reset_stats: ResetStats,
    total_terminations: usize,

    // Reused across ticks
    rewards_buffer: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvInitError {
    Config(EnvConfigError),
    Plan(PlanError),
}

impl fmt::Display for EnvInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvInitError::Config(e) => write!(f, "{}", e),
            EnvInitError::Plan(e) => write!(f, "{}", e),
        }
    }
}

impl From<EnvConfigError> for EnvInitError {
    fn from(err: EnvConfigError) -> Self {
        EnvInitError::Config(err)
    }
}

impl From<PlanError> for EnvInitError {
    fn from(err: PlanError) -> Self {
        EnvInitError::Plan(err)
    }
}

impl Error for EnvInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnvInitError::Config(e) => Some(e),
            EnvInitError::Plan(e) => Some(e),
        }
    }
}

impl ContactEnv {
    /// Compile `plans` against `assets` and place every env.
    pub fn new(config: EnvConfig, plans: &PlanSet, assets: &AssetSet) -> Result<Self, EnvInitError> {
        config.validate()?;
        let mut sampling_rng = derive_rng(config.seed, RngStream::Sampling);
        let tables = compiler::compile_plans(plans, assets, &config, &mut sampling_rng)?;
        Self::from_tables(config, tables)
    }

    /// Build from already compiled tables.
    pub fn from_tables(config: EnvConfig, tables: PlanTables) -> Result<Self, EnvInitError> {
        config.validate()?;
        if tables.is_empty() {
            return Err(PlanError::NoPlans.into());
        }
        let facing_slots = config.facing_joint_slots()?;
        let mut layout_rng = derive_rng(config.seed, RngStream::Layout);
        let layout = SceneLayout::new(
            config.num_envs,
            config.envs_per_row,
            config.num_scenes,
            config.env_spacing,
            tables.len(),
            &mut layout_rng,
        );
        let min_bodies = config
            .strike_body_ids
            .iter()
            .chain(config.contact_body_ids.iter())
            .copied()
            .chain(
                config
                    .keypoint_offsets
                    .iter()
                    .flat_map(|k| [k.body, k.frame_body]),
            )
            .max()
            .map_or(0, |b| b + 1);
        let state = EnvironmentBatchState::new(layout.env_plan.clone());
        let local_grid = LocalGrid::new(config.local_scale, config.local_interval);
        info!(
            num_envs = config.num_envs,
            plans = tables.len(),
            grid = config.num_scenes,
            "created contact env"
        );

        let mut env = Self {
            spawn_rng: derive_rng(config.seed, RngStream::Spawn),
            rewards_buffer: vec![0.0; config.num_envs],
            config,
            tables,
            layout,
            state,
            local_grid,
            facing_slots,
            min_bodies,
            tick: 0,
            reset_stats: ResetStats::default(),
            total_terminations: 0,
        };
        env.reset_all();
        Ok(env)
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn tables(&self) -> &PlanTables {
        &self.tables
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    pub fn state(&self) -> &EnvironmentBatchState {
        &self.state
    }

    pub fn num_envs(&self) -> usize {
        self.state.len()
    }

    /// Bodies per env a frame must carry.
    pub fn min_bodies(&self) -> usize {
        self.min_bodies
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn step_modes(&self) -> &[usize] {
        &self.state.step_mode
    }

    pub fn reset_stats(&self) -> ResetStats {
        self.reset_stats
    }

    pub fn total_terminations(&self) -> usize {
        self.total_terminations
    }

    /// Width of one env's observation row.
    pub fn observation_size(&self) -> usize {
        observation_size(self.config.local_scale)
    }

    /// Send every env back to step 0 with a fresh spawn pose.
    pub fn reset_all(&mut self) -> Vec<SpawnPose> {
        (0..self.num_envs()).map(|env| self.respawn(env)).collect()
    }

    /// Observations for the current frame without advancing reward or
    /// termination state; used right after a reset.
    pub fn observe(&mut self, frame: &SimFrame) -> Result<Vec<f64>, FrameError> {
        frame.validate(self.num_envs(), self.min_bodies)?;
        self.step_keypoint_phase(frame);
        let mut obs = Vec::with_capacity(self.num_envs() * self.observation_size());
        self.step_observation_phase(frame, &mut obs);
        Ok(obs)
    }

    /// Run one tick: observation with last tick's feedback, reward, then
    /// termination flags. Step transitions wait for [`ContactEnv::reset`].
    pub fn step(&mut self, frame: &SimFrame) -> Result<StepOutput, FrameError> {
        frame.validate(self.num_envs(), self.min_bodies)?;
        self.tick += 1;
        for p in &mut self.state.progress {
            *p += 1;
        }

        self.step_keypoint_phase(frame);
        let mut observations = Vec::with_capacity(self.num_envs() * self.observation_size());
        self.step_observation_phase(frame, &mut observations);
        self.step_reward_phase(frame);
        self.step_termination_phase(frame);

        for (prev, root) in self.state.prev_root_pos.iter_mut().zip(&frame.root_pos) {
            *prev = *root;
        }
        self.total_terminations += self.state.terminated.iter().filter(|t| **t).count();

        let contact_mode: Vec<bool> = (0..self.num_envs())
            .map(|env| self.state.not_walking(env))
            .collect();
        let metrics = StepMetrics::collect(
            self.tick,
            &self.rewards_buffer,
            &self.state.reset,
            &self.state.terminated,
            &contact_mode,
            &self.state.step_mode,
            &self.state.location_diff,
        );
        Ok(StepOutput {
            observations,
            rewards: self.rewards_buffer.clone(),
            resets: self.state.reset.clone(),
            terminated: self.state.terminated.clone(),
            metrics,
        })
    }

    /// Advance or restart the given envs. Fulfilled envs move to their next
    /// step; the rest, and envs that finished their plan, respawn. Returns the
    /// poses of respawned envs.
    pub fn reset(&mut self, env_ids: &[usize]) -> Result<Vec<SpawnPose>, FrameError> {
        let num_envs = self.num_envs();
        if let Some(&env_id) = env_ids.iter().find(|&&e| e >= num_envs) {
            return Err(FrameError::EnvIdOutOfRange { env_id, num_envs });
        }
        let (spawns, stats) = self.apply_reset_pass(env_ids);
        self.reset_stats.accumulate(&stats);
        Ok(spawns)
    }

    /// Envs flagged for reset by the last tick.
    pub fn pending_resets(&self) -> Vec<usize> {
        self.state
            .reset
            .iter()
            .enumerate()
            .filter(|(_, r)| **r)
            .map(|(env, _)| env)
            .collect()
    }
}

/// Observation width for a `local_scale x local_scale` heightmap crop.
pub fn observation_size(local_scale: usize) -> usize {
    3 + 6 + 3 + 3 + 2 + 2 * JOINT_NUM + local_scale * local_scale + 3 * JOINT_NUM + 3 * JOINT_NUM
}
