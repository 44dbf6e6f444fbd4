use super::super::ContactEnv;
use crate::constants::JOINT_NUM;
use crate::frame::SimFrame;
use crate::math::{facing_dir, normalize_or_zero2, normalize_or_zero3, quat_from_xyzw, soft_combine};
use nalgebra::{Vector2, Vector3};

impl ContactEnv {
    /// Score every env and record the feedback later passes read:
    /// `location_diff`, per-slot `joint_diff` and `joint_idx`, and `tar_dir`.
    ///
    /// Both diffs are squared distances. Envs with any valid contact slot use
    /// the near-contact reward and report `location_diff = 0`; the rest use
    /// the navigation reward toward the stand point.
    pub(in crate::env) fn step_reward_phase(&mut self, frame: &SimFrame) {
        let config = &self.config;
        let state = &mut self.state;
        for env in 0..state.len() {
            let root = Vector3::from(frame.root_pos[env]);
            let facing = facing_dir(&quat_from_xyzw(frame.root_rot[env]));

            let mut slot_rewards = [1.0; JOINT_NUM];
            let mut joint_diff = [0.0; JOINT_NUM];
            let mut joint_idx = [0usize; JOINT_NUM];
            for slot in 0..JOINT_NUM {
                let targets = state.slot_targets(env, slot);
                let joint = state.joint_pos[env][slot];
                let (idx, err) = targets.nearest(joint);
                let nearest = targets.point(idx);

                let r = (-config.near_pos_err_scale * err).exp();
                let contact = state.contact_type[env][slot];
                let r_contact = if contact { r } else { 1.0 - r };

                let dir = Vector3::from(state.contact_direction[env][slot]);
                let r_dir = if !contact || dir == Vector3::zeros() {
                    1.0
                } else {
                    let approach = normalize_or_zero3(&Vector3::new(
                        joint[0] - nearest[0],
                        joint[1] - nearest[1],
                        joint[2] - nearest[2],
                    ));
                    approach.dot(&dir).max(0.0)
                };

                joint_diff[slot] = if r_dir < config.dir_fail_threshold {
                    err + config.dir_fail_penalty
                } else {
                    err
                };
                joint_idx[slot] = idx;
                if state.contact_valid[env][slot] {
                    slot_rewards[slot] = soft_combine([r_contact, r_dir]);
                }
            }
            let mut near_reward = soft_combine(slot_rewards);

            // Facing only counts when a single facing joint is the whole step.
            let valid = &state.contact_valid[env];
            let facing_slot = if valid.iter().filter(|v| **v).count() == 1 {
                self.facing_slots.iter().copied().find(|&s| valid[s])
            } else {
                None
            };
            let obj_facing = match facing_slot {
                Some(slot) => {
                    let target = state.slot_targets(env, slot).point(joint_idx[slot]);
                    let to_target =
                        normalize_or_zero2(&Vector2::new(target[0] - root.x, target[1] - root.y));
                    to_target.dot(&facing).max(0.0)
                }
                None => 1.0,
            };
            near_reward = soft_combine([obj_facing, near_reward]);

            let pos_diff = Vector3::from(state.stand_point[env]) - root;
            let pos_err = pos_diff.norm_squared();
            let pos_reward = (-config.pos_err_scale * pos_err).exp();
            let dist_mask = pos_err < config.dist_threshold;
            let tar_dir = normalize_or_zero2(&pos_diff.xy());

            let root_vel = (root - Vector3::from(state.prev_root_pos[env])) / config.dt;
            let tar_speed = tar_dir.dot(&root_vel.xy());
            let speed_err = config.target_speed - tar_speed;
            let vel_reward = if dist_mask {
                1.0
            } else if tar_speed <= 0.0 {
                0.0
            } else {
                (-config.vel_err_scale * speed_err * speed_err).exp()
            };
            let facing_reward = if dist_mask {
                1.0
            } else {
                tar_dir.dot(&facing).max(0.0)
            };
            let far_reward = soft_combine([pos_reward, vel_reward, facing_reward]);

            let not_walking = state.not_walking(env);
            self.rewards_buffer[env] = if not_walking { near_reward } else { far_reward };
            state.location_diff[env] = if not_walking { 0.0 } else { pos_err };
            state.joint_diff[env] = joint_diff;
            state.joint_idx[env] = joint_idx;
            state.tar_dir[env] = [tar_dir.x, tar_dir.y];
        }
    }
}
