pub mod assets;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod env;
pub mod frame;
pub mod heightmap;
pub mod joints;
pub mod layout;
pub mod math;
pub mod metrics;
pub mod plan;
pub mod rng;
pub mod sampler;
pub mod scene;
pub mod segmentation;
pub mod spatial;
pub mod state;

pub use config::EnvConfig;
pub use constants::{JOINT_NUM, POINTS_PER_PART};
pub use env::{observation_size, ContactEnv, EnvInitError};
pub use frame::{FrameError, SimFrame, SpawnPose, StepOutput};
pub use metrics::{ResetStats, RolloutSummary, StepMetrics};
pub use plan::{parse_plan_set, PlanError, PlanSet};
