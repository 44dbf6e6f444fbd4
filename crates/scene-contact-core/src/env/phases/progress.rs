use super::super::ContactEnv;
use crate::frame::SpawnPose;
use crate::math::quat_to_xyzw;
use crate::metrics::ResetStats;
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use std::f64::consts::TAU;
use tracing::debug;

impl ContactEnv {
    /// Step transitions for the flagged envs, evaluated against the step that
    /// was active during the last tick. A repeated id is handled once.
    pub(in crate::env) fn apply_reset_pass(&mut self, env_ids: &[usize]) -> (Vec<SpawnPose>, ResetStats) {
        let mut stats = ResetStats::default();
        let mut spawns = Vec::new();
        let mut seen = vec![false; self.state.len()];
        for &env in env_ids {
            if std::mem::replace(&mut seen[env], true) {
                continue;
            }
            let fulfilled = self.step_fulfilled(env);
            let plan_id = self.state.plan_id[env];
            let max_steps = self.tables.plans[plan_id].max_steps;

            if fulfilled {
                self.state.step_mode[env] += 1;
                stats.advanced += 1;
            }
            let finished = self.state.step_mode[env] == max_steps;
            if finished {
                stats.completed += 1;
            }
            if !fulfilled {
                stats.failed += 1;
            }

            self.state.still_count[env] = 0;
            self.state.progress[env] = 0;
            self.state.reset[env] = false;
            self.state.terminated[env] = false;

            if !fulfilled || finished {
                spawns.push(self.respawn(env));
            } else {
                let offset = self.layout.env_offset[env];
                self.state
                    .load_step(env, &self.tables.plans[plan_id], offset);
                debug!(
                    env,
                    plan = %self.tables.plans[plan_id].name,
                    step = self.state.step_mode[env],
                    constraints = ?self.tables.plans[plan_id].step(self.state.step_mode[env]).description,
                    "advanced to next step"
                );
            }
        }
        (spawns, stats)
    }

    /// Put env `env` back at its plan's start: step 0, random yaw, spawn
    /// position offset into the env's frame.
    pub(in crate::env) fn respawn(&mut self, env: usize) -> SpawnPose {
        let plan_id = self.state.plan_id[env];
        let plan = &self.tables.plans[plan_id];
        let offset = self.layout.env_offset[env];

        self.state.step_mode[env] = 0;
        self.state.still_count[env] = 0;
        self.state.progress[env] = 0;
        self.state.reset[env] = false;
        self.state.terminated[env] = false;
        self.state.load_step(env, plan, offset);

        let yaw = self.spawn_rng.random::<f64>() * TAU;
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw);
        let position = [
            offset[0] + plan.init_pos[0],
            offset[1] + plan.init_pos[1],
            self.config.spawn_height,
        ];
        self.state.prev_root_pos[env] = position;
        debug!(
            env,
            plan = %plan.name,
            constraints = ?plan.step(0).description,
            "respawned at step 0"
        );
        SpawnPose {
            env_id: env,
            position,
            rotation: quat_to_xyzw(&rotation),
        }
    }
}
