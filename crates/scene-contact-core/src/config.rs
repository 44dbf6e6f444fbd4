use serde::{Deserialize, Serialize};

use crate::constants::JOINT_NUM;
use crate::joints;

/// Rigid-body keypoint correction: the joint position reported for `body` is
/// `frame_body.position + frame_body.rotation * offset`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KeypointOffset {
    pub body: usize,
    pub frame_body: usize,
    pub offset: [f64; 3],
}

/// Rigid-body index per joint slot for the 15-body humanoid
/// (pelvis, torso, head, right arm, left arm, right leg, left leg).
pub const DEFAULT_STRIKE_BODY_IDS: [usize; JOINT_NUM] = [0, 12, 13, 14, 9, 10, 11, 1, 2, 6, 7, 8, 3, 4, 5];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Deterministic seed for sampling, scene layout and spawn yaw.
    pub seed: u64,
    /// Number of simulated environments in the batch.
    pub num_envs: usize,
    /// Environments per row of the simulator's env grid.
    pub envs_per_row: usize,
    /// Half-distance between neighbouring env origins (world units).
    pub env_spacing: f64,
    /// Side length of the square grid of scene cells.
    pub num_scenes: usize,
    /// Ticks before an episode is forcibly reset.
    pub max_episode_length: usize,
    /// Simulation timestep used to derive root velocity.
    pub dt: f64,
    /// Side length of the egocentric heightmap crop.
    pub local_scale: usize,
    /// Spacing between heightmap crop samples (world units).
    pub local_interval: f64,
    /// Side length of the per-scene heightmap grid.
    pub height_map_dim: usize,
    /// Points at or above this height are zeroed before max-height bucketing.
    pub height_ceiling: f64,
    /// Squared planar distance beyond which a crop sample reads height 0.
    pub height_lookup_tolerance_sq: f64,
    /// A contact slot is satisfied when its joint distance is strictly below this.
    pub contact_threshold: f64,
    /// A no-contact slot is satisfied when its joint distance is at least this.
    pub no_contact_threshold: f64,
    /// Root-to-stand-point error below which the episode-level gate holds.
    pub location_threshold: f64,
    /// Max per-body L1 velocity below which a tick counts as still.
    pub still_velocity_threshold: f64,
    /// Stillness ticks tolerated before a fulfilled step forces a reset.
    pub still_ticks: u32,
    /// Any contact-force component above this terminates the episode.
    pub contact_force_limit: f64,
    /// Toggle for fall-based early termination.
    pub enable_early_termination: bool,
    /// Height below which a non-contact body counts as fallen.
    pub termination_height: f64,
    /// Contact-force component above which a non-contact body counts as touching.
    pub fall_contact_threshold: f64,
    /// Rigid bodies allowed to touch the ground without counting as a fall.
    pub contact_body_ids: Vec<usize>,
    /// Rigid-body index for each joint slot.
    pub strike_body_ids: Vec<usize>,
    /// Margin trimmed from part X/Y extremes before sampling.
    pub edge_margin: f64,
    /// Exponential scale on squared root-to-stand-point distance.
    pub pos_err_scale: f64,
    /// Exponential scale on target-speed error.
    pub vel_err_scale: f64,
    /// Exponential scale on squared joint-to-part distance.
    pub near_pos_err_scale: f64,
    /// Desired speed along the target direction while navigating.
    pub target_speed: f64,
    /// Squared distance under which velocity and facing terms are saturated.
    pub dist_threshold: f64,
    /// Direction reward below which a contact slot is marked as failing.
    pub dir_fail_threshold: f64,
    /// Distance added to a slot whose direction reward fails.
    pub dir_fail_penalty: f64,
    /// Joints whose sole activation enables the facing reward term.
    pub facing_joints: Vec<String>,
    /// Keypoint corrections applied to raw rigid-body positions.
    pub keypoint_offsets: Vec<KeypointOffset>,
    /// Root height assigned to spawned humanoids.
    pub spawn_height: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_envs: 16,
            envs_per_row: 4,
            env_spacing: 5.0,
            num_scenes: 2,
            max_episode_length: 300,
            dt: 1.0 / 30.0,
            local_scale: 9,
            local_interval: 0.2,
            height_map_dim: 100,
            height_ceiling: 1.5,
            height_lookup_tolerance_sq: 0.05,
            contact_threshold: 0.2,
            no_contact_threshold: 0.1,
            location_threshold: 0.1,
            still_velocity_threshold: 0.6,
            still_ticks: 10,
            contact_force_limit: 10_000.0,
            enable_early_termination: true,
            termination_height: 0.15,
            fall_contact_threshold: 0.1,
            contact_body_ids: Vec::new(),
            strike_body_ids: DEFAULT_STRIKE_BODY_IDS.to_vec(),
            edge_margin: 0.2,
            pos_err_scale: 5.0,
            vel_err_scale: 2.0,
            near_pos_err_scale: 5.0,
            target_speed: 1.0,
            dist_threshold: 0.2,
            dir_fail_threshold: 0.5,
            dir_fail_penalty: 1.0,
            facing_joints: vec!["left_hand".to_string(), "right_hand".to_string()],
            keypoint_offsets: vec![
                KeypointOffset {
                    body: 1,
                    frame_body: 0,
                    offset: [0.0, 0.0, 0.236151 + 0.15],
                },
                KeypointOffset {
                    body: 2,
                    frame_body: 1,
                    offset: [0.0, 0.0, 0.223894 + 0.15],
                },
            ],
            spawn_height: 0.89,
        }
    }
}

macro_rules! define_env_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum EnvConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for EnvConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_env_config_error! {
    InvalidNumEnvs => "num_envs must be greater than 0";
    TooManyEnvs { max: usize, actual: usize } => "Too many envs: {} > max {}", actual, max;
    InvalidEnvsPerRow => "envs_per_row must be greater than 0";
    InvalidEnvSpacing => "env_spacing must be positive and finite";
    InvalidNumScenes => "num_scenes must be greater than 0";
    InvalidMaxEpisodeLength => "max_episode_length must be greater than 1";
    InvalidDt => "dt must be positive and finite";
    InvalidLocalScale => "local_scale must be greater than 1";
    InvalidLocalInterval => "local_interval must be positive and finite";
    InvalidHeightMapDim => "height_map_dim must be greater than 1";
    InvalidHeightCeiling => "height_ceiling must be positive and finite";
    InvalidHeightLookupTolerance => "height_lookup_tolerance_sq must be positive and finite";
    InvalidContactThreshold => "contact_threshold must be positive and finite";
    InvalidNoContactThreshold => "no_contact_threshold must be finite and non-negative";
    InvalidLocationThreshold => "location_threshold must be positive and finite";
    InvalidStillVelocityThreshold => "still_velocity_threshold must be finite and non-negative";
    InvalidContactForceLimit => "contact_force_limit must be positive and finite";
    InvalidTerminationHeight => "termination_height must be finite";
    InvalidFallContactThreshold => "fall_contact_threshold must be finite and non-negative";
    InvalidStrikeBodyCount { expected: usize, actual: usize } => "strike_body_ids must list {} bodies, got {}", expected, actual;
    InvalidEdgeMargin => "edge_margin must be finite and non-negative";
    InvalidRewardScale => "pos_err_scale, vel_err_scale and near_pos_err_scale must be positive and finite";
    InvalidTargetSpeed => "target_speed must be positive and finite";
    InvalidDistThreshold => "dist_threshold must be positive and finite";
    InvalidDirFailThreshold => "dir_fail_threshold must be finite and within [0,1]";
    InvalidDirFailPenalty => "dir_fail_penalty must be finite and non-negative";
    UnknownFacingJoint { name: String } => "facing joint '{name}' is not a known joint";
    InvalidKeypointOffset => "keypoint_offsets must be finite";
    InvalidSpawnHeight => "spawn_height must be finite";
}

impl std::error::Error for EnvConfigError {}

impl EnvConfig {
    pub const MAX_ENVS: usize = 65_536;

    pub fn validate(&self) -> Result<(), EnvConfigError> {
        self.validate_batch()?;
        self.validate_sensing()?;
        self.validate_progress()?;
        self.validate_termination()?;
        self.validate_reward()?;
        self.validate_bodies()?;
        Ok(())
    }

    /// Slot indices of the configured facing joints.
    pub fn facing_joint_slots(&self) -> Result<Vec<usize>, EnvConfigError> {
        self.facing_joints
            .iter()
            .map(|name| {
                joints::joint_index(name)
                    .ok_or_else(|| EnvConfigError::UnknownFacingJoint { name: name.clone() })
            })
            .collect()
    }

    fn validate_batch(&self) -> Result<(), EnvConfigError> {
        if self.num_envs == 0 {
            return Err(EnvConfigError::InvalidNumEnvs);
        }
        if self.num_envs > Self::MAX_ENVS {
            return Err(EnvConfigError::TooManyEnvs {
                max: Self::MAX_ENVS,
                actual: self.num_envs,
            });
        }
        if self.envs_per_row == 0 {
            return Err(EnvConfigError::InvalidEnvsPerRow);
        }
        if !(self.env_spacing.is_finite() && self.env_spacing > 0.0) {
            return Err(EnvConfigError::InvalidEnvSpacing);
        }
        if self.num_scenes == 0 {
            return Err(EnvConfigError::InvalidNumScenes);
        }
        Ok(())
    }

    fn validate_sensing(&self) -> Result<(), EnvConfigError> {
        if self.local_scale < 2 {
            return Err(EnvConfigError::InvalidLocalScale);
        }
        if !(self.local_interval.is_finite() && self.local_interval > 0.0) {
            return Err(EnvConfigError::InvalidLocalInterval);
        }
        if self.height_map_dim < 2 {
            return Err(EnvConfigError::InvalidHeightMapDim);
        }
        if !(self.height_ceiling.is_finite() && self.height_ceiling > 0.0) {
            return Err(EnvConfigError::InvalidHeightCeiling);
        }
        if !(self.height_lookup_tolerance_sq.is_finite() && self.height_lookup_tolerance_sq > 0.0)
        {
            return Err(EnvConfigError::InvalidHeightLookupTolerance);
        }
        if !(self.edge_margin.is_finite() && self.edge_margin >= 0.0) {
            return Err(EnvConfigError::InvalidEdgeMargin);
        }
        Ok(())
    }

    fn validate_progress(&self) -> Result<(), EnvConfigError> {
        if self.max_episode_length < 2 {
            return Err(EnvConfigError::InvalidMaxEpisodeLength);
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(EnvConfigError::InvalidDt);
        }
        if !(self.contact_threshold.is_finite() && self.contact_threshold > 0.0) {
            return Err(EnvConfigError::InvalidContactThreshold);
        }
        if !(self.no_contact_threshold.is_finite() && self.no_contact_threshold >= 0.0) {
            return Err(EnvConfigError::InvalidNoContactThreshold);
        }
        if !(self.location_threshold.is_finite() && self.location_threshold > 0.0) {
            return Err(EnvConfigError::InvalidLocationThreshold);
        }
        if !(self.still_velocity_threshold.is_finite() && self.still_velocity_threshold >= 0.0) {
            return Err(EnvConfigError::InvalidStillVelocityThreshold);
        }
        Ok(())
    }

    fn validate_termination(&self) -> Result<(), EnvConfigError> {
        if !(self.contact_force_limit.is_finite() && self.contact_force_limit > 0.0) {
            return Err(EnvConfigError::InvalidContactForceLimit);
        }
        if !self.termination_height.is_finite() {
            return Err(EnvConfigError::InvalidTerminationHeight);
        }
        if !(self.fall_contact_threshold.is_finite() && self.fall_contact_threshold >= 0.0) {
            return Err(EnvConfigError::InvalidFallContactThreshold);
        }
        if !self.spawn_height.is_finite() {
            return Err(EnvConfigError::InvalidSpawnHeight);
        }
        Ok(())
    }

    fn validate_reward(&self) -> Result<(), EnvConfigError> {
        let scales = [
            self.pos_err_scale,
            self.vel_err_scale,
            self.near_pos_err_scale,
        ];
        if !scales.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(EnvConfigError::InvalidRewardScale);
        }
        if !(self.target_speed.is_finite() && self.target_speed > 0.0) {
            return Err(EnvConfigError::InvalidTargetSpeed);
        }
        if !(self.dist_threshold.is_finite() && self.dist_threshold > 0.0) {
            return Err(EnvConfigError::InvalidDistThreshold);
        }
        if !(self.dir_fail_threshold.is_finite() && (0.0..=1.0).contains(&self.dir_fail_threshold))
        {
            return Err(EnvConfigError::InvalidDirFailThreshold);
        }
        if !(self.dir_fail_penalty.is_finite() && self.dir_fail_penalty >= 0.0) {
            return Err(EnvConfigError::InvalidDirFailPenalty);
        }
        self.facing_joint_slots()?;
        Ok(())
    }

    fn validate_bodies(&self) -> Result<(), EnvConfigError> {
        if self.strike_body_ids.len() != JOINT_NUM {
            return Err(EnvConfigError::InvalidStrikeBodyCount {
                expected: JOINT_NUM,
                actual: self.strike_body_ids.len(),
            });
        }
        if !self
            .keypoint_offsets
            .iter()
            .all(|k| k.offset.iter().all(|v| v.is_finite()))
        {
            return Err(EnvConfigError::InvalidKeypointOffset);
        }
        Ok(())
    }
}
