use nalgebra::{Rotation3, Vector3};

use crate::plan::PlanSpec;

/// Placement applied to raw scan vertices before anything samples them.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneTransform {
    /// Euler triples, each applied as `Rx * Ry * Rz` about the origin, in order.
    pub rotate: Vec<[f64; 3]>,
    /// Uniform scale about the vertex centroid.
    pub scale: f64,
    /// Final translation after the floor is moved to z = 0.
    pub transfer: [f64; 3],
}

impl SceneTransform {
    pub fn from_plan(plan: &PlanSpec) -> Self {
        Self {
            rotate: plan.rotate.clone(),
            scale: plan.scale,
            transfer: plan.transfer,
        }
    }

    fn rotation(&self) -> Rotation3<f64> {
        self.rotate
            .iter()
            .fold(Rotation3::identity(), |acc, r| xyz_rotation(*r) * acc)
    }

    pub fn apply(&self, vertices: &[[f64; 3]]) -> Vec<[f64; 3]> {
        if vertices.is_empty() {
            return Vec::new();
        }
        let rot = self.rotation();
        let mut out: Vec<Vector3<f64>> = vertices
            .iter()
            .map(|v| rot * Vector3::new(v[0], v[1], v[2]))
            .collect();

        let centroid = out.iter().sum::<Vector3<f64>>() / out.len() as f64;
        for v in &mut out {
            *v = (*v - centroid) * self.scale + centroid;
        }

        let floor = out.iter().map(|v| v.z).fold(f64::INFINITY, f64::min);
        let shift = Vector3::new(self.transfer[0], self.transfer[1], self.transfer[2] - floor);
        out.into_iter()
            .map(|v| {
                let p = v + shift;
                [p.x, p.y, p.z]
            })
            .collect()
    }
}

fn xyz_rotation(r: [f64; 3]) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), r[0])
        * Rotation3::from_axis_angle(&Vector3::y_axis(), r[1])
        * Rotation3::from_axis_angle(&Vector3::z_axis(), r[2])
}
