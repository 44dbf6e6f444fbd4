use super::super::ContactEnv;
use crate::frame::SimFrame;

impl ContactEnv {
    /// Whether env `env` satisfies every valid slot of its active step and
    /// the success gate (near the stand point, no excessive force).
    ///
    /// Contact slots need `joint_diff < contact_threshold`; no-contact slots
    /// need `joint_diff >= no_contact_threshold`. A step with no valid slot
    /// is fulfilled whenever the gate holds.
    pub(in crate::env) fn step_fulfilled(&self, env: usize) -> bool {
        let state = &self.state;
        let success = state.location_diff[env] < self.config.location_threshold
            && !state.big_force[env];
        success
            && (0..state.joint_diff[env].len()).all(|slot| {
                if !state.contact_valid[env][slot] {
                    return true;
                }
                let diff = state.joint_diff[env][slot];
                if state.contact_type[env][slot] {
                    diff < self.config.contact_threshold
                } else {
                    diff >= self.config.no_contact_threshold
                }
            })
    }

    /// Flag envs to reset or terminate after this tick's reward pass.
    pub(in crate::env) fn step_termination_phase(&mut self, frame: &SimFrame) {
        for env in 0..self.state.len() {
            let forces = frame.bodies(&frame.contact_forces, env);
            self.state.big_force[env] = forces
                .iter()
                .flatten()
                .any(|f| f.abs() > self.config.contact_force_limit);
            self.state.fulfilled[env] = self.step_fulfilled(env);

            let max_speed = frame
                .bodies(&frame.body_vel, env)
                .iter()
                .map(|v| v[0].abs() + v[1].abs() + v[2].abs())
                .fold(0.0, f64::max);
            if max_speed < self.config.still_velocity_threshold {
                self.state.still_count[env] += 1;
            } else if max_speed > self.config.still_velocity_threshold {
                self.state.still_count[env] = 0;
            }

            let mut terminated = self.has_fallen(frame, env);
            terminated |= self.state.big_force[env];

            let timed_out = self.state.progress[env] + 1 >= self.config.max_episode_length;
            let settled =
                self.state.still_count[env] > self.config.still_ticks && self.state.fulfilled[env];
            self.state.terminated[env] = terminated;
            self.state.reset[env] = timed_out || terminated || settled;
        }
    }

    /// A body outside `contact_body_ids` is touching something and a body
    /// outside that set is below `termination_height`. Ignored for the first
    /// ticks after a reset, when contact forces are still settling.
    fn has_fallen(&self, frame: &SimFrame, env: usize) -> bool {
        let config = &self.config;
        if !config.enable_early_termination || self.state.progress[env] <= 1 {
            return false;
        }
        let allowed = |body: &usize| config.contact_body_ids.contains(body);
        let forces = frame.bodies(&frame.contact_forces, env);
        let positions = frame.bodies(&frame.body_pos, env);
        let fall_contact = forces.iter().enumerate().any(|(b, f)| {
            !allowed(&b) && f.iter().any(|c| c.abs() > config.fall_contact_threshold)
        });
        let fall_height = positions
            .iter()
            .enumerate()
            .any(|(b, p)| !allowed(&b) && p[2] < config.termination_height);
        fall_contact && fall_height
    }
}
