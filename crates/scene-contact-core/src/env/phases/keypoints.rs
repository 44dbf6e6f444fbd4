use super::super::ContactEnv;
use crate::frame::SimFrame;
use crate::math::quat_from_xyzw;
use nalgebra::Vector3;

impl ContactEnv {
    /// Gather joint-slot positions from rigid bodies, replacing corrected
    /// keypoints (torso, head) with offsets from their frame bodies. Offsets
    /// are always taken from raw body poses.
    pub(in crate::env) fn step_keypoint_phase(&mut self, frame: &SimFrame) {
        let config = &self.config;
        for (env, joints) in self.state.joint_pos.iter_mut().enumerate() {
            let pos = frame.bodies(&frame.body_pos, env);
            let rot = frame.bodies(&frame.body_rot, env);
            for (slot, joint) in joints.iter_mut().enumerate() {
                let body = config.strike_body_ids[slot];
                *joint = match config.keypoint_offsets.iter().find(|k| k.body == body) {
                    Some(k) => {
                        let base = pos[k.frame_body];
                        let o = quat_from_xyzw(rot[k.frame_body])
                            * Vector3::new(k.offset[0], k.offset[1], k.offset[2]);
                        [base[0] + o.x, base[1] + o.y, base[2] + o.z]
                    }
                    None => pos[body],
                };
            }
        }
    }
}
