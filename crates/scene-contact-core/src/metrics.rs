use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub tick: usize,
    pub reward_mean: f64,
    pub reward_min: f64,
    pub reward_max: f64,
    /// Envs flagged for reset this tick.
    pub reset_count: usize,
    pub terminated_count: usize,
    /// Envs whose active step has a valid contact constraint.
    pub contact_mode_count: usize,
    pub step_mode_mean: f64,
    pub location_diff_mean: f64,
}

/// Outcome counts of reset passes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ResetStats {
    /// Envs that fulfilled their step and moved to the next one.
    pub advanced: usize,
    /// Envs that fulfilled the final step of their plan.
    pub completed: usize,
    /// Envs sent back to step 0 without fulfilling their step.
    pub failed: usize,
}

impl ResetStats {
    pub fn accumulate(&mut self, other: &ResetStats) {
        self.advanced += other.advanced;
        self.completed += other.completed;
        self.failed += other.failed;
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RolloutSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub ticks: usize,
    pub sample_every: usize,
    pub num_envs: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub resets: ResetStats,
    #[serde(default)]
    pub total_terminations: usize,
    #[serde(default)]
    pub final_step_modes: Vec<usize>,
}

impl StepMetrics {
    pub fn collect(
        tick: usize,
        rewards: &[f64],
        resets: &[bool],
        terminated: &[bool],
        contact_mode: &[bool],
        step_modes: &[usize],
        location_diff: &[f64],
    ) -> Self {
        let n = rewards.len().max(1) as f64;
        Self {
            tick,
            reward_mean: rewards.iter().sum::<f64>() / n,
            reward_min: rewards.iter().copied().fold(f64::INFINITY, f64::min),
            reward_max: rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            reset_count: resets.iter().filter(|r| **r).count(),
            terminated_count: terminated.iter().filter(|t| **t).count(),
            contact_mode_count: contact_mode.iter().filter(|c| **c).count(),
            step_mode_mean: step_modes.iter().map(|&s| s as f64).sum::<f64>() / n,
            location_diff_mean: location_diff.iter().sum::<f64>() / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_summarizes_batch() {
        let m = StepMetrics::collect(
            4,
            &[0.2, 0.6],
            &[true, false],
            &[false, false],
            &[true, true],
            &[1, 2],
            &[0.0, 0.5],
        );
        assert_eq!(m.tick, 4);
        assert!((m.reward_mean - 0.4).abs() < 1e-12);
        assert_eq!(m.reward_min, 0.2);
        assert_eq!(m.reward_max, 0.6);
        assert_eq!(m.reset_count, 1);
        assert_eq!(m.terminated_count, 0);
        assert_eq!(m.contact_mode_count, 2);
        assert_eq!(m.step_mode_mean, 1.5);
        assert_eq!(m.location_diff_mean, 0.25);
    }

    #[test]
    fn summary_deserializes_without_optional_fields() {
        let json = r#"{"ticks": 3, "sample_every": 1, "num_envs": 2, "samples": []}"#;
        let s: RolloutSummary = serde_json::from_str(json).expect("summary parses");
        assert_eq!(s.schema_version, 1);
        assert_eq!(s.resets, ResetStats::default());
        assert!(s.final_step_modes.is_empty());
    }
}
