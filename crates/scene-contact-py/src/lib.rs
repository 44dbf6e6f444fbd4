use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use scene_contact_core::assets;
use scene_contact_core::config::EnvConfig;
use scene_contact_core::env::ContactEnv;
use scene_contact_core::frame::{SimFrame, SpawnPose};
use scene_contact_core::plan::{parse_plan_set, PlanSet};
use std::path::Path;

type Pose = (f64, f64, f64, f64, f64, f64, f64);

/// Batched scene-contact environment driven by an external physics engine.
///
/// Every tick the caller passes flat per-env and per-body buffers from the
/// simulator and receives observations, rewards and reset flags. Envs flagged
/// for reset are passed back to `reset`, which returns root poses to apply.
#[pyclass(name = "ContactEnv")]
pub struct PyContactEnv {
    inner: ContactEnv,
}

#[pymethods]
impl PyContactEnv {
    /// Args:
    ///     plans_json: plan file contents, keyed by plan name
    ///     assets_dir: directory with the per-scene vertex and segmentation JSON
    ///     config_json: optional partial config; missing fields use defaults
    #[new]
    #[pyo3(signature = (plans_json, assets_dir, config_json=None))]
    fn new(plans_json: &str, assets_dir: &str, config_json: Option<&str>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let plans: PlanSet = parse_plan_set(plans_json)
            .map_err(|e| PyValueError::new_err(format!("invalid plan json: {e}")))?;
        let assets = assets::load_for_plans(Path::new(assets_dir), &plans)
            .map_err(|e| PyValueError::new_err(format!("failed to load scene assets: {e}")))?;
        let inner = ContactEnv::new(config, &plans, &assets)
            .map_err(|e| PyValueError::new_err(format!("invalid environment: {e}")))?;
        Ok(Self { inner })
    }

    #[getter]
    fn num_envs(&self) -> usize {
        self.inner.num_envs()
    }

    #[getter]
    fn observation_size(&self) -> usize {
        self.inner.observation_size()
    }

    /// Bodies per env every frame buffer must carry.
    #[getter]
    fn min_bodies(&self) -> usize {
        self.inner.min_bodies()
    }

    #[getter]
    fn tick(&self) -> usize {
        self.inner.tick()
    }

    /// Observations for the current simulator state without advancing rewards.
    fn observe(
        &mut self,
        root_states: Vec<f64>,
        body_pos: Vec<f64>,
        body_rot: Vec<f64>,
        body_vel: Vec<f64>,
        contact_forces: Vec<f64>,
    ) -> PyResult<Vec<f64>> {
        let frame = self.frame(&root_states, &body_pos, &body_rot, &body_vel, &contact_forces)?;
        self.inner
            .observe(&frame)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Run one tick.
    ///
    /// Returns:
    ///     (observations, rewards, resets, terminated, metrics_json)
    fn step(
        &mut self,
        root_states: Vec<f64>,
        body_pos: Vec<f64>,
        body_rot: Vec<f64>,
        body_vel: Vec<f64>,
        contact_forces: Vec<f64>,
    ) -> PyResult<(Vec<f64>, Vec<f64>, Vec<bool>, Vec<bool>, String)> {
        let frame = self.frame(&root_states, &body_pos, &body_rot, &body_vel, &contact_forces)?;
        let out = self
            .inner
            .step(&frame)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let metrics = serde_json::to_string(&out.metrics)
            .map_err(|e| PyValueError::new_err(format!("failed to serialize metrics: {e}")))?;
        Ok((out.observations, out.rewards, out.resets, out.terminated, metrics))
    }

    /// Advance or respawn `env_ids`. Returns `(env_id, (x, y, z, qx, qy, qz, qw))`
    /// for every env whose humanoid must be moved.
    fn reset(&mut self, env_ids: Vec<usize>) -> PyResult<Vec<(usize, Pose)>> {
        let spawns = self
            .inner
            .reset(&env_ids)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(spawns.iter().map(pose_tuple).collect())
    }

    /// Respawn every env at step 0.
    fn reset_all(&mut self) -> Vec<(usize, Pose)> {
        self.inner.reset_all().iter().map(pose_tuple).collect()
    }

    fn pending_resets(&self) -> Vec<usize> {
        self.inner.pending_resets()
    }

    fn step_modes(&self) -> Vec<usize> {
        self.inner.step_modes().to_vec()
    }

    fn reset_stats_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.reset_stats())
            .map_err(|e| PyValueError::new_err(format!("failed to serialize reset stats: {e}")))
    }
}

impl PyContactEnv {
    fn frame(
        &self,
        root_states: &[f64],
        body_pos: &[f64],
        body_rot: &[f64],
        body_vel: &[f64],
        contact_forces: &[f64],
    ) -> PyResult<SimFrame> {
        SimFrame::from_flat(
            self.inner.num_envs(),
            root_states,
            body_pos,
            body_rot,
            body_vel,
            contact_forces,
        )
        .map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

fn pose_tuple(pose: &SpawnPose) -> (usize, Pose) {
    let [x, y, z] = pose.position;
    let [qx, qy, qz, qw] = pose.rotation;
    (pose.env_id, (x, y, z, qx, qy, qz, qw))
}

fn parse_config(config_json: Option<&str>) -> PyResult<EnvConfig> {
    match config_json {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| PyValueError::new_err(format!("invalid config json: {e}"))),
        None => Ok(EnvConfig::default()),
    }
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&EnvConfig::default())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize default config: {e}")))
}

#[pyfunction]
fn validate_config_json(config_json: &str) -> PyResult<bool> {
    let config = parse_config(Some(config_json))?;
    config
        .validate()
        .map(|_| true)
        .map_err(|e| PyValueError::new_err(format!("invalid environment configuration: {e}")))
}

#[pyfunction]
fn observation_size(local_scale: usize) -> usize {
    scene_contact_core::env::observation_size(local_scale)
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyContactEnv>()?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(observation_size, m)?)?;
    Ok(())
}
