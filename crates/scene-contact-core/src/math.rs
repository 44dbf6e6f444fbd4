//! Rotation helpers and the adaptive reward combinator.
//!
//! Quaternions cross the simulation boundary as `[x, y, z, w]`.

use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3};

use crate::constants::{ADAPTIVE_EPS, NORMALIZE_EPS};

/// Build a unit quaternion from `[x, y, z, w]`; degenerate input maps to identity.
pub fn quat_from_xyzw(q: [f64; 4]) -> UnitQuaternion<f64> {
    UnitQuaternion::try_new(Quaternion::new(q[3], q[0], q[1], q[2]), NORMALIZE_EPS)
        .unwrap_or_else(UnitQuaternion::identity)
}

pub fn quat_to_xyzw(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.i, q.j, q.k, q.w]
}

/// Yaw of the body x-axis projected onto the ground plane.
pub fn heading_angle(rot: &UnitQuaternion<f64>) -> f64 {
    let dir = rot * Vector3::x();
    dir.y.atan2(dir.x)
}

pub fn heading_quat(rot: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading_angle(rot))
}

pub fn heading_quat_inv(rot: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -heading_angle(rot))
}

/// Planar facing direction of the heading frame.
pub fn facing_dir(rot: &UnitQuaternion<f64>) -> Vector2<f64> {
    let f = heading_quat(rot) * Vector3::x();
    Vector2::new(f.x, f.y)
}

/// Six-value rotation encoding: the rotated x-axis (tangent) followed by the
/// rotated z-axis (normal).
pub fn quat_to_tan_norm(rot: &UnitQuaternion<f64>) -> [f64; 6] {
    let tan = rot * Vector3::x();
    let norm = rot * Vector3::z();
    [tan.x, tan.y, tan.z, norm.x, norm.y, norm.z]
}

/// Unit vector along `v`, or zero when `v` is degenerate.
pub fn normalize_or_zero3(v: &Vector3<f64>) -> Vector3<f64> {
    let n = v.norm();
    if n > NORMALIZE_EPS {
        v / n
    } else {
        Vector3::zeros()
    }
}

pub fn normalize_or_zero2(v: &Vector2<f64>) -> Vector2<f64> {
    let n = v.norm();
    if n > NORMALIZE_EPS {
        v / n
    } else {
        Vector2::zeros()
    }
}

/// Softmin-style weights `w_i = (1 - r_i) / (sum_j (1 - r_j) + eps)`.
pub fn adaptive_weights<const N: usize>(rewards: [f64; N]) -> [f64; N] {
    let denom = rewards.iter().map(|r| 1.0 - r).sum::<f64>() + ADAPTIVE_EPS;
    rewards.map(|r| (1.0 - r) / denom)
}

/// Combine sub-rewards with [`adaptive_weights`], pulling the result toward
/// the least satisfied term.
pub fn soft_combine<const N: usize>(rewards: [f64; N]) -> f64 {
    adaptive_weights(rewards)
        .iter()
        .zip(rewards.iter())
        .map(|(w, r)| w * r)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn heading_ignores_pitch_and_roll() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3);
        assert_relative_eq!(heading_angle(&(yaw * pitch)), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn heading_inverse_undoes_heading() {
        let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 3.0);
        let v = Vector3::new(1.0, 2.0, 3.0);
        let back = heading_quat_inv(&rot) * (heading_quat(&rot) * v);
        assert_relative_eq!(back, v, epsilon = 1e-12);
    }

    #[test]
    fn identity_tan_norm_is_x_then_z() {
        let enc = quat_to_tan_norm(&UnitQuaternion::identity());
        assert_eq!(enc, [1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn degenerate_quaternion_maps_to_identity() {
        let q = quat_from_xyzw([0.0, 0.0, 0.0, 0.0]);
        assert_eq!(q, UnitQuaternion::identity());
    }

    #[test]
    fn xyzw_round_trip_preserves_layout() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let xyzw = quat_to_xyzw(&q);
        assert_relative_eq!(xyzw[2], (PI / 4.0).sin(), epsilon = 1e-12);
        assert_relative_eq!(xyzw[3], (PI / 4.0).cos(), epsilon = 1e-12);
    }

    #[test]
    fn normalize_guards_zero_vectors() {
        assert_eq!(normalize_or_zero3(&Vector3::zeros()), Vector3::zeros());
        assert_eq!(normalize_or_zero2(&Vector2::zeros()), Vector2::zeros());
        assert_relative_eq!(
            normalize_or_zero2(&Vector2::new(3.0, 4.0)),
            Vector2::new(0.6, 0.8)
        );
    }

    #[test]
    fn adaptive_weights_favor_worst_term() {
        let w = adaptive_weights([0.9, 0.1]);
        assert!(w[1] > w[0]);
        assert_relative_eq!(w[0] + w[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn soft_combine_stays_near_worst_term() {
        let combined = soft_combine([0.9, 0.1]);
        assert_relative_eq!(combined, (0.1 * 0.9 + 0.9 * 0.1) / 1.0001, epsilon = 1e-12);
        assert!(combined < 0.5);
    }

    #[test]
    fn fully_satisfied_terms_combine_to_zero_weight() {
        assert_eq!(soft_combine([1.0, 1.0]), 0.0);
    }
}
