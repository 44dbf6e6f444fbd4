use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use scene_contact_core::assets::{self, AssetSet, SceneAssets};
use scene_contact_core::config::EnvConfig;
use scene_contact_core::env::ContactEnv;
use scene_contact_core::frame::{SimFrame, SpawnPose};
use scene_contact_core::joints::JOINT_NAMES;
use scene_contact_core::math::{quat_from_xyzw, quat_to_xyzw};
use scene_contact_core::metrics::{RolloutSummary, StepMetrics};
use scene_contact_core::plan::{parse_plan_set, PlanSet};
use scene_contact_core::rng::create_rng;
use scene_contact_core::segmentation::SegmentGroup;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const WARMUP_TICKS: usize = 10;
const BENCHMARK_TICKS: usize = 200;
const TARGET_TPS: f64 = 60.0;
/// Root speed of the scripted humanoid while walking.
const SCRIPTED_SPEED: f64 = 1.0;

#[derive(Parser)]
#[command(name = "scene-contact")]
#[command(about = "Scene-contact environment CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the environment with a scripted kinematic humanoid
    Run {
        /// Plan file (JSON)
        #[arg(long)]
        plans: PathBuf,

        /// Directory with per-scene vertex and segmentation JSON
        #[arg(long)]
        assets: PathBuf,

        /// Path to config file (JSON, optional)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for summary.json (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of ticks to run (default: 1000)
        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Keep a metrics sample every N ticks (default: 50)
        #[arg(long, default_value_t = 50)]
        sample_every: usize,
    },
    /// Compile plans and print a per-step summary
    Compile {
        #[arg(long)]
        plans: PathBuf,

        #[arg(long)]
        assets: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the throughput benchmark on a synthetic scene
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EnvConfig> {
    let config = match path {
        Some(path) => {
            let file = File::open(path).context("failed to open config file")?;
            serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?
        }
        None => EnvConfig::default(),
    };
    config.validate().context("Config validation error")?;
    Ok(config)
}

fn load_plans(plans: &Path, assets_dir: &Path) -> Result<(PlanSet, AssetSet)> {
    let text = fs::read_to_string(plans).context("failed to read plan file")?;
    let plans = parse_plan_set(&text).context("failed to parse plan file")?;
    let assets = assets::load_for_plans(assets_dir, &plans).context("failed to load scene assets")?;
    Ok((plans, assets))
}

/// Kinematic stand-in for a physics engine: walks each root straight to its
/// stand point, then snaps contact joints onto their targets.
struct ScriptedHumanoid {
    num_bodies: usize,
    root: Vec<[f64; 3]>,
    yaw: Vec<f64>,
    frame: SimFrame,
}

impl ScriptedHumanoid {
    fn new(env: &ContactEnv) -> Self {
        let n = env.num_envs();
        let b = env.min_bodies();
        Self {
            num_bodies: b,
            root: vec![[0.0; 3]; n],
            yaw: vec![0.0; n],
            frame: SimFrame {
                num_bodies: b,
                root_pos: vec![[0.0; 3]; n],
                root_rot: vec![[0.0, 0.0, 0.0, 1.0]; n],
                body_pos: vec![[0.0; 3]; n * b],
                body_rot: vec![[0.0, 0.0, 0.0, 1.0]; n * b],
                body_vel: vec![[0.0; 3]; n * b],
                contact_forces: vec![[0.0; 3]; n * b],
            },
        }
    }

    fn apply_spawns(&mut self, spawns: &[SpawnPose]) {
        for pose in spawns {
            self.root[pose.env_id] = pose.position;
            let (_, _, yaw) = quat_from_xyzw(pose.rotation).euler_angles();
            self.yaw[pose.env_id] = yaw;
        }
    }

    /// Advance every env by one tick and rebuild the frame.
    fn advance(&mut self, env: &ContactEnv) -> &SimFrame {
        let state = env.state();
        let config = env.config();
        for e in 0..env.num_envs() {
            let root = self.root[e];
            let target = state.stand_point[e];
            let delta = [target[0] - root[0], target[1] - root[1]];
            let dist = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt();
            let reach = (SCRIPTED_SPEED * config.dt).min(dist);
            let mut vel = [0.0; 3];
            if dist > 1e-9 {
                self.yaw[e] = delta[1].atan2(delta[0]);
                let step = [delta[0] / dist * reach, delta[1] / dist * reach];
                self.root[e] = [root[0] + step[0], root[1] + step[1], root[2]];
                vel = [step[0] / config.dt, step[1] / config.dt, 0.0];
            }

            let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.yaw[e]);
            let base = e * self.num_bodies;
            self.frame.root_pos[e] = self.root[e];
            self.frame.root_rot[e] = quat_to_xyzw(&rot);
            for b in 0..self.num_bodies {
                self.frame.body_pos[base + b] = self.root[e];
                self.frame.body_rot[base + b] = quat_to_xyzw(&rot);
                self.frame.body_vel[base + b] = vel;
            }
            if state.not_walking(e) {
                for (slot, &body) in config.strike_body_ids.iter().enumerate() {
                    if state.contact_valid[e][slot] && state.contact_type[e][slot] {
                        let point = state.slot_targets(e, slot).point(state.joint_idx[e][slot]);
                        self.frame.body_pos[base + body] = point;
                    }
                }
            }
        }
        &self.frame
    }
}

fn run_rollout(env: &mut ContactEnv, ticks: usize, sample_every: usize) -> Result<RolloutSummary> {
    let mut humanoid = ScriptedHumanoid::new(env);
    humanoid.apply_spawns(&env.reset_all());
    let mut samples: Vec<StepMetrics> = Vec::new();
    for tick in 0..ticks {
        let frame = humanoid.advance(env);
        let out = env.step(frame).context("scripted frame rejected")?;
        if sample_every > 0 && tick % sample_every == 0 {
            samples.push(out.metrics);
        }
        let pending = env.pending_resets();
        if !pending.is_empty() {
            let spawns = env.reset(&pending).context("reset failed")?;
            humanoid.apply_spawns(&spawns);
        }
    }
    Ok(RolloutSummary {
        schema_version: 1,
        ticks,
        sample_every,
        num_envs: env.num_envs(),
        samples,
        resets: env.reset_stats(),
        total_terminations: env.total_terminations(),
        final_step_modes: env.step_modes().to_vec(),
    })
}

#[derive(Serialize)]
struct StepReport {
    stand_point: [f64; 3],
    contact_slots: Vec<&'static str>,
    no_contact_slots: Vec<&'static str>,
    constraints: Vec<String>,
}

#[derive(Serialize)]
struct PlanReport {
    name: String,
    scene_id: String,
    init_pos: [f64; 2],
    steps: Vec<StepReport>,
}

fn compile_report(env: &ContactEnv) -> Vec<PlanReport> {
    env.tables()
        .plans
        .iter()
        .map(|plan| PlanReport {
            name: plan.name.clone(),
            scene_id: plan.scene_id.clone(),
            init_pos: plan.init_pos,
            steps: plan.steps[..plan.max_steps]
                .iter()
                .map(|step| {
                    let slots = |contact: bool| -> Vec<&'static str> {
                        (0..JOINT_NAMES.len())
                            .filter(|&s| step.contact_valid[s] && step.contact_type[s] == contact)
                            .map(|s| JOINT_NAMES[s])
                            .collect()
                    };
                    StepReport {
                        stand_point: step.stand_point,
                        contact_slots: slots(true),
                        no_contact_slots: slots(false),
                        constraints: step.description.clone(),
                    }
                })
                .collect(),
        })
        .collect()
}

/// Floor patch (group 0) with a box seat (group 1) of `seat_points` points.
fn synthetic_scene(rng: &mut ChaCha12Rng, seat_points: usize) -> SceneAssets {
    let mut vertices = Vec::new();
    let mut seg_indices = Vec::new();
    for i in 0..40 {
        for j in 0..40 {
            vertices.push([i as f64 * 0.1, j as f64 * 0.1, 0.0]);
            seg_indices.push(0);
        }
    }
    for _ in 0..seat_points {
        vertices.push([
            2.0 + rng.random::<f64>() * 0.5,
            2.0 + rng.random::<f64>() * 0.5,
            0.45,
        ]);
        seg_indices.push(1);
    }
    SceneAssets {
        vertices,
        seg_indices,
        seg_groups: vec![
            SegmentGroup {
                segments: vec![0],
                ..SegmentGroup::default()
            },
            SegmentGroup {
                segments: vec![1],
                ..SegmentGroup::default()
            },
        ],
    }
}

fn synthetic_plans() -> Result<PlanSet> {
    let json = r#"{
        "sit": {
            "scene_id": "bench",
            "init_pos": [0.5, 0.5, 0.9],
            "obj": {
                "001": {"id": 1, "name": "chair", "part_id": {"seat": [0]},
                        "stand_point": [[2.25, 1.8, 0.89]]},
                "002": {"id": 0, "name": "floor", "part_id": {"ground": [0]}}
            },
            "contact_pairs": [
                [["chair001", "none", "none", "none", "none"]],
                [["chair001", "seat", "pelvis", "contact", "up"],
                 ["floor002", "ground", "head", "not_contact", "none"]],
                [["chair001", "seat", "left_hand", "contact", "none"],
                 ["chair001", "left_hand", "right_hand", "contact", "none"]]
            ]
        }
    }"#;
    parse_plan_set(json).context("synthetic plan is malformed")
}

fn run_benchmark(num_envs: usize, seed: u64) -> Result<()> {
    let config = EnvConfig {
        num_envs,
        envs_per_row: (num_envs as f64).sqrt().ceil() as usize,
        seed,
        ..EnvConfig::default()
    };
    config.validate().context("Benchmark config validation error")?;

    let mut rng = create_rng(seed);
    let assets = AssetSet::from([("bench".to_string(), synthetic_scene(&mut rng, 600))]);
    let plans = synthetic_plans()?;
    let build_start = Instant::now();
    let mut env =
        ContactEnv::new(config, &plans, &assets).context("Failed to initialize environment")?;
    let build_ms = build_start.elapsed().as_secs_f64() * 1000.0;

    run_rollout(&mut env, WARMUP_TICKS, 0)?;
    let start = Instant::now();
    let summary = run_rollout(&mut env, BENCHMARK_TICKS, 0)?;
    let elapsed = start.elapsed().as_secs_f64();
    let ticks_per_sec = BENCHMARK_TICKS as f64 / elapsed;

    println!("--- {num_envs} envs ---");
    println!("  Build:         {build_ms:.1} ms");
    println!(
        "  Throughput:    {ticks_per_sec:.1} ticks/sec ({:.0} env-steps/sec)",
        ticks_per_sec * num_envs as f64
    );
    let verdict = if ticks_per_sec >= TARGET_TPS {
        "GO"
    } else {
        "NO-GO"
    };
    println!("  Verdict:       {verdict} (target: >={TARGET_TPS} ticks/sec)");
    println!(
        "  Resets:        advanced={} completed={} failed={}",
        summary.resets.advanced, summary.resets.completed, summary.resets.failed
    );
    println!();
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = EnvConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Compile {
            plans,
            assets,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let (plans, assets) = load_plans(&plans, &assets)?;
            let env = ContactEnv::new(config, &plans, &assets)
                .context("Failed to initialize environment")?;
            println!("{}", serde_json::to_string_pretty(&compile_report(&env))?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p scene-contact-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Scene Contact Throughput ===");
            println!("Warmup: {WARMUP_TICKS} ticks, Benchmark: {BENCHMARK_TICKS} ticks");
            println!();
            for num_envs in [16, 256, 1024, 4096] {
                run_benchmark(num_envs, 42)?;
            }
        }
        Commands::Run {
            plans,
            assets,
            config,
            out,
            steps,
            sample_every,
        } => {
            let config = load_config(config.as_deref())?;
            let (plans, assets) = load_plans(&plans, &assets)?;
            let mut env = ContactEnv::new(config, &plans, &assets)
                .context("Failed to initialize environment")?;
            info!(ticks = steps, num_envs = env.num_envs(), "starting scripted rollout");

            let summary = run_rollout(&mut env, steps, sample_every)?;
            println!(
                "Resets: advanced={} completed={} failed={}, terminations={}",
                summary.resets.advanced,
                summary.resets.completed,
                summary.resets.failed,
                summary.total_terminations
            );

            if let Some(out_dir) = out {
                fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let path = out_dir.join("summary.json");
                let json = serde_json::to_string_pretty(&summary)?;
                fs::write(&path, json).context("failed to write summary")?;
                println!("Results written to {:?}", path);
            }
        }
    }

    Ok(())
}
