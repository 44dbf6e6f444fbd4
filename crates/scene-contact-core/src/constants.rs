/// Number of humanoid joint slots tracked by every per-joint buffer.
pub const JOINT_NUM: usize = 15;

/// Fixed cardinality of a sampled part point buffer. Every `(plan, step, joint)`
/// slot holds exactly this many points so batched lookups stay rectangular.
pub const POINTS_PER_PART: usize = 200;

/// Upper bound on steps per plan. Plans with fewer steps leave trailing slots
/// invalid; the state machine never advances into them.
pub const MAX_STEP_POOL: usize = 30;

/// Denominator guard for adaptive reward weighting.
pub const ADAPTIVE_EPS: f64 = 1e-4;

/// Norms below this are treated as zero-length (no directional preference).
pub const NORMALIZE_EPS: f64 = 1e-12;

/// Prime multiplier used to derive independent RNG streams from a base seed.
pub const RNG_DERIVATION_PRIME: u64 = 7919;
