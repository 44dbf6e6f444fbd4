use super::super::ContactEnv;
use crate::constants::JOINT_NUM;
use crate::frame::SimFrame;
use crate::math::{heading_quat_inv, quat_from_xyzw, quat_to_tan_norm};
use nalgebra::{UnitQuaternion, Vector3};

impl ContactEnv {
    /// Append one observation row per env to `out`.
    ///
    /// Row layout: target position (3), target rotation (6), target velocity
    /// (3), target angular velocity (3), target direction (2), contact type
    /// and validity flags, heightmap crop, per-joint target vectors, per-joint
    /// contact directions. Target direction and contact directions stay in
    /// scene axes; the other vectors are in the heading frame.
    pub(in crate::env) fn step_observation_phase(&self, frame: &SimFrame, out: &mut Vec<f64>) {
        let state = &self.state;
        for env in 0..state.len() {
            let root = frame.root_pos[env];
            let root_rot = quat_from_xyzw(frame.root_rot[env]);
            let heading_inv = heading_quat_inv(&root_rot);

            // Target keeps its absolute height; horizontal reach is clamped to 1.
            let stand = state.stand_point[env];
            let mut local_tar =
                heading_inv * Vector3::new(stand[0] - root[0], stand[1] - root[1], stand[2]);
            let planar = local_tar.xy().norm();
            if planar > 1.0 {
                local_tar.x /= planar;
                local_tar.y /= planar;
            }
            out.extend_from_slice(&[local_tar.x, local_tar.y, local_tar.z]);

            // Target rotation is identity; velocities are reserved and zero.
            let local_tar_rot = heading_inv * UnitQuaternion::identity();
            out.extend_from_slice(&quat_to_tan_norm(&local_tar_rot));
            out.extend_from_slice(&[0.0; 6]);
            out.extend_from_slice(&state.tar_dir[env]);

            out.extend(state.contact_type[env].iter().map(|&t| f64::from(u8::from(t))));
            out.extend(state.contact_valid[env].iter().map(|&v| f64::from(u8::from(v))));

            let plan = &self.tables.plans[state.plan_id[env]];
            let offset = self.layout.env_offset[env];
            let root_local = [root[0] - offset[0], root[1] - offset[1], root[2]];
            self.local_grid.crop_into(
                &plan.heightmap,
                root_local,
                &root_rot,
                self.config.height_lookup_tolerance_sq,
                out,
            );

            for slot in 0..JOINT_NUM {
                if !state.contact_valid[env][slot] {
                    out.extend_from_slice(&[0.0; 3]);
                    continue;
                }
                let target = state
                    .slot_targets(env, slot)
                    .point(state.joint_idx[env][slot]);
                let joint = state.joint_pos[env][slot];
                let rel = heading_inv
                    * Vector3::new(
                        target[0] - joint[0],
                        target[1] - joint[1],
                        target[2] - joint[2],
                    );
                out.extend_from_slice(&[rel.x, rel.y, rel.z]);
            }
            for dir in &state.contact_direction[env] {
                out.extend_from_slice(dir);
            }
        }
    }
}
