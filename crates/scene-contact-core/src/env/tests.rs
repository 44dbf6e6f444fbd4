use super::*;
use crate::assets::SceneAssets;
use crate::compiler::{CompiledPlan, StepTable};
use crate::constants::{MAX_STEP_POOL, POINTS_PER_PART};
use crate::heightmap::HeightMap;
use crate::math::soft_combine;
use crate::plan::parse_plan_set;
use crate::segmentation::SegmentGroup;
use crate::state::SlotTargets;
use approx::assert_abs_diff_eq;
use std::error::Error;

const PELVIS: usize = 0;
const LEFT_HAND: usize = 11;
const RIGHT_HAND: usize = 14;
const SEAT: [f64; 3] = [2.0, 0.0, 0.5];

/// One plan: walk to (2, 0), then put the pelvis on a seat above that spot.
fn walk_then_sit() -> PlanTables {
    let floor: Vec<[f64; 3]> = (0..10)
        .flat_map(|i| (0..10).map(move |j| [i as f64 * 0.5, j as f64 * 0.5 - 2.0, 0.0]))
        .collect();
    let walk = StepTable {
        stand_point: [2.0, 0.0, 0.0],
        ..StepTable::default()
    };
    let mut sit = StepTable {
        stand_point: [2.0, 0.0, 0.0],
        ..StepTable::default()
    };
    sit.contact_type[PELVIS] = true;
    sit.contact_valid[PELVIS] = true;
    sit.part_points[..POINTS_PER_PART].fill(SEAT);

    let mut steps = vec![walk, sit];
    steps.resize(MAX_STEP_POOL, StepTable::default());
    PlanTables {
        plans: vec![CompiledPlan {
            name: "sit".to_string(),
            scene_id: "t".to_string(),
            init_pos: [0.0, 0.0],
            max_steps: 2,
            steps,
            heightmap: HeightMap::build(&floor, 10, 1.5),
        }],
    }
}

fn single_env_config() -> EnvConfig {
    EnvConfig {
        num_envs: 1,
        envs_per_row: 1,
        num_scenes: 1,
        ..EnvConfig::default()
    }
}

fn make_env(config: EnvConfig) -> ContactEnv {
    ContactEnv::from_tables(config, walk_then_sit()).expect("env builds")
}

/// Every env's root at `root` facing +x, with all bodies at `bodies`, at rest.
fn frame(env: &ContactEnv, root: [f64; 3], bodies: [f64; 3]) -> SimFrame {
    let n = env.num_envs();
    let b = env.min_bodies();
    SimFrame {
        num_bodies: b,
        root_pos: vec![root; n],
        root_rot: vec![[0.0, 0.0, 0.0, 1.0]; n],
        body_pos: vec![bodies; n * b],
        body_rot: vec![[0.0, 0.0, 0.0, 1.0]; n * b],
        body_vel: vec![[0.0; 3]; n * b],
        contact_forces: vec![[0.0; 3]; n * b],
    }
}

fn enter_sit_step(env: &mut ContactEnv) {
    env.state.step_mode[0] = 1;
    let offset = env.layout.env_offset[0];
    env.state.load_step(0, &env.tables.plans[0], offset);
}

#[test]
fn from_tables_rejects_invalid_config() {
    let config = EnvConfig {
        num_envs: 0,
        ..EnvConfig::default()
    };
    assert!(matches!(
        ContactEnv::from_tables(config, walk_then_sit()),
        Err(EnvInitError::Config(EnvConfigError::InvalidNumEnvs))
    ));
}

#[test]
fn from_tables_rejects_empty_tables() {
    let err = ContactEnv::from_tables(single_env_config(), PlanTables { plans: Vec::new() })
        .err()
        .expect("empty tables are rejected");
    assert_eq!(err, EnvInitError::Plan(PlanError::NoPlans));
    assert!(err.source().is_some());
}

#[test]
fn min_bodies_covers_the_humanoid() {
    let env = make_env(single_env_config());
    assert_eq!(env.min_bodies(), 15);
}

#[test]
fn reset_all_spawns_every_env_at_plan_start() {
    let mut env = make_env(EnvConfig {
        num_envs: 4,
        envs_per_row: 2,
        ..single_env_config()
    });
    let poses = env.reset_all();
    assert_eq!(poses.len(), 4);
    for pose in &poses {
        let offset = env.layout().env_offset[pose.env_id];
        assert_eq!(pose.position, [offset[0], offset[1], 0.89]);
        let q = pose.rotation;
        assert_abs_diff_eq!(q[0], 0.0);
        assert_abs_diff_eq!(q[1], 0.0);
        assert_abs_diff_eq!(q[2] * q[2] + q[3] * q[3], 1.0, epsilon = 1e-12);
        assert_eq!(env.state().prev_root_pos[pose.env_id], pose.position);
    }
    assert!(env.step_modes().iter().all(|&s| s == 0));
}

#[test]
fn observation_has_fixed_width() {
    assert_eq!(observation_size(9), 218);
    let mut env = make_env(EnvConfig {
        num_envs: 3,
        envs_per_row: 3,
        ..single_env_config()
    });
    let f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    let obs = env.observe(&f).expect("frame is valid");
    assert_eq!(obs.len(), 3 * 218);
    let out = env.step(&f).expect("frame is valid");
    assert_eq!(out.observations.len(), 3 * env.observation_size());
    assert_eq!(out.rewards.len(), 3);
}

#[test]
fn observation_clamps_target_reach_to_unit_distance() {
    let mut env = make_env(single_env_config());
    let f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    let obs = env.observe(&f).expect("frame is valid");
    assert_abs_diff_eq!(obs[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(obs[1], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(obs[2], 0.0, epsilon = 1e-12);
}

#[test]
fn observations_are_deterministic_for_a_seed() {
    let config = EnvConfig {
        num_envs: 4,
        envs_per_row: 2,
        ..single_env_config()
    };
    let mut a = make_env(config.clone());
    let mut b = make_env(config);
    assert_eq!(a.reset_all(), b.reset_all());
    let f = frame(&a, [0.3, -0.2, 0.89], [0.3, -0.2, 0.5]);
    let oa = a.step(&f).expect("frame is valid");
    let ob = b.step(&f).expect("frame is valid");
    assert_eq!(oa.observations, ob.observations);
    assert_eq!(oa.rewards, ob.rewards);
}

#[test]
fn step_rejects_malformed_frames() {
    let mut env = make_env(single_env_config());
    let mut f = frame(&env, [0.0; 3], [0.0; 3]);
    f.num_bodies = 3;
    assert_eq!(
        env.step(&f).err(),
        Some(FrameError::TooFewBodies {
            required: 15,
            actual: 3
        })
    );

    let mut f = frame(&env, [0.0; 3], [0.0; 3]);
    f.body_vel.pop();
    assert!(matches!(env.step(&f), Err(FrameError::BodyCount { .. })));
    assert_eq!(env.tick(), 0);
}

#[test]
fn reset_rejects_unknown_env_ids() {
    let mut env = make_env(single_env_config());
    assert_eq!(
        env.reset(&[0, 3]),
        Err(FrameError::EnvIdOutOfRange {
            env_id: 3,
            num_envs: 1
        })
    );
}

#[test]
fn walking_step_reports_squared_distance_to_stand_point() {
    let mut env = make_env(single_env_config());
    let f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    let out = env.step(&f).expect("frame is valid");
    assert_abs_diff_eq!(env.state().location_diff[0], 4.0 + 0.89 * 0.89, epsilon = 1e-12);
    assert_eq!(env.state().tar_dir[0], [1.0, 0.0]);
    assert!((0.0..=1.0).contains(&out.rewards[0]));
    assert_eq!(out.metrics.contact_mode_count, 0);
}

#[test]
fn contact_step_reports_zero_location_diff() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    let f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    let out = env.step(&f).expect("frame is valid");
    assert_eq!(env.state().location_diff[0], 0.0);
    assert_eq!(out.metrics.contact_mode_count, 1);
    let expected = (SEAT[0] * SEAT[0]) + (SEAT[2] - 0.89) * (SEAT[2] - 0.89);
    assert_abs_diff_eq!(env.state().joint_diff[0][PELVIS], expected, epsilon = 1e-12);
}

#[test]
fn contact_slot_threshold_is_strict() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    env.state.location_diff[0] = 0.0;
    env.state.joint_diff[0][PELVIS] = 0.2;
    assert!(!env.step_fulfilled(0));
    env.state.joint_diff[0][PELVIS] = 0.19;
    assert!(env.step_fulfilled(0));
}

#[test]
fn no_contact_slot_threshold_is_inclusive() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    env.state.contact_type[0][PELVIS] = false;
    env.state.location_diff[0] = 0.0;
    env.state.joint_diff[0][PELVIS] = 0.1;
    assert!(env.step_fulfilled(0));
    env.state.joint_diff[0][PELVIS] = 0.09;
    assert!(!env.step_fulfilled(0));
}

#[test]
fn step_without_valid_slots_needs_only_the_location_gate() {
    let mut env = make_env(single_env_config());
    env.state.location_diff[0] = 0.05;
    assert!(env.step_fulfilled(0));
    env.state.big_force[0] = true;
    assert!(!env.step_fulfilled(0));
    env.state.big_force[0] = false;
    env.state.location_diff[0] = 0.1;
    assert!(!env.step_fulfilled(0));
}

#[test]
fn still_fulfilled_env_resets_after_eleven_ticks() {
    let mut env = make_env(single_env_config());
    let f = frame(&env, [2.0, 0.0, 0.0], [2.0, 0.0, 0.9]);
    for tick in 1..=10 {
        let out = env.step(&f).expect("frame is valid");
        assert!(!out.resets[0], "reset too early at tick {tick}");
    }
    let out = env.step(&f).expect("frame is valid");
    assert!(out.resets[0]);
    assert!(!out.terminated[0]);
    assert_eq!(env.pending_resets(), vec![0]);

    let pending = env.pending_resets();
    let spawns = env.reset(&pending).expect("ids are valid");
    assert!(spawns.is_empty());
    assert_eq!(env.step_modes(), &[1]);
    assert_eq!(env.state().still_count[0], 0);
    assert_eq!(env.state().progress[0], 0);
    assert!(env.state().not_walking(0));
    assert_eq!(
        env.reset_stats(),
        ResetStats {
            advanced: 1,
            completed: 0,
            failed: 0
        }
    );
}

#[test]
fn repeated_reset_id_advances_once() {
    let mut env = make_env(single_env_config());
    let f = frame(&env, [2.0, 0.0, 0.0], [2.0, 0.0, 0.9]);
    env.step(&f).expect("frame is valid");
    assert!(env.state().fulfilled[0]);

    let spawns = env.reset(&[0, 0]).expect("ids are valid");
    assert!(spawns.is_empty());
    assert_eq!(env.step_modes(), &[1]);
    assert_eq!(
        env.reset_stats(),
        ResetStats {
            advanced: 1,
            completed: 0,
            failed: 0
        }
    );
}

#[test]
fn moving_env_never_settles() {
    let mut env = make_env(single_env_config());
    let mut f = frame(&env, [2.0, 0.0, 0.0], [2.0, 0.0, 0.9]);
    f.body_vel[3] = [0.5, 0.5, 0.0];
    for _ in 0..20 {
        let out = env.step(&f).expect("frame is valid");
        assert!(!out.resets[0]);
    }
    assert_eq!(env.state().still_count[0], 0);
}

#[test]
fn excessive_contact_force_terminates_and_fails_the_step() {
    let mut env = make_env(single_env_config());
    let mut f = frame(&env, [2.0, 0.0, 0.0], [2.0, 0.0, 0.9]);
    f.contact_forces[4] = [0.0, 0.0, 10_001.0];
    let out = env.step(&f).expect("frame is valid");
    assert!(out.terminated[0]);
    assert!(out.resets[0]);
    assert_eq!(out.metrics.terminated_count, 1);
    assert_eq!(env.total_terminations(), 1);

    let spawns = env.reset(&[0]).expect("ids are valid");
    assert_eq!(spawns.len(), 1);
    assert_eq!(env.step_modes(), &[0]);
    assert_eq!(env.reset_stats().failed, 1);
}

#[test]
fn fall_is_ignored_right_after_reset() {
    let mut env = make_env(single_env_config());
    let mut f = frame(&env, [0.0, 0.0, 0.1], [0.0, 0.0, 0.05]);
    f.contact_forces[5] = [0.0, 0.0, 50.0];
    let out = env.step(&f).expect("frame is valid");
    assert!(!out.terminated[0]);
    let out = env.step(&f).expect("frame is valid");
    assert!(out.terminated[0]);
    assert!(out.resets[0]);
}

#[test]
fn fall_check_skips_allowed_contact_bodies() {
    let mut env = make_env(EnvConfig {
        contact_body_ids: (0..15).collect(),
        ..single_env_config()
    });
    let mut f = frame(&env, [0.0, 0.0, 0.1], [0.0, 0.0, 0.05]);
    f.contact_forces[5] = [0.0, 0.0, 50.0];
    for _ in 0..3 {
        let out = env.step(&f).expect("frame is valid");
        assert!(!out.terminated[0]);
    }
}

#[test]
fn episode_times_out_at_max_length() {
    let mut env = make_env(EnvConfig {
        max_episode_length: 3,
        ..single_env_config()
    });
    let mut f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    f.body_vel[0] = [1.0, 0.0, 0.0];
    assert!(!env.step(&f).expect("frame is valid").resets[0]);
    let out = env.step(&f).expect("frame is valid");
    assert!(out.resets[0]);
    assert!(!out.terminated[0]);
}

#[test]
fn completing_the_last_step_respawns_at_step_zero() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    let f = frame(&env, [2.0, 0.0, 0.0], SEAT);
    env.step(&f).expect("frame is valid");
    assert_eq!(env.state().joint_diff[0][PELVIS], 0.0);
    assert!(env.state().fulfilled[0]);

    let spawns = env.reset(&[0]).expect("ids are valid");
    assert_eq!(spawns.len(), 1);
    assert_eq!(env.step_modes(), &[0]);
    assert!(!env.state().not_walking(0));
    let stats = env.reset_stats();
    assert_eq!((stats.advanced, stats.completed, stats.failed), (1, 1, 0));
}

#[test]
fn step_mode_never_exceeds_plan_length() {
    let mut env = make_env(single_env_config());
    let at_target = frame(&env, [2.0, 0.0, 0.0], SEAT);
    for _ in 0..6 {
        env.step(&at_target).expect("frame is valid");
        env.reset(&[0]).expect("ids are valid");
        assert!(env.step_modes()[0] < env.tables().plans[0].max_steps);
    }
    assert_eq!(env.reset_stats().completed, 3);
}

#[test]
fn active_part_slots_hold_points_per_part() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    assert_eq!(env.state().part_points[0].len(), JOINT_NUM * POINTS_PER_PART);
    match env.state().slot_targets(0, PELVIS) {
        SlotTargets::Points(points) => {
            assert_eq!(points.len(), POINTS_PER_PART);
            assert!(points.iter().all(|p| *p == SEAT));
        }
        SlotTargets::Joint(_) => panic!("pelvis slot targets a part"),
    }
}

#[test]
fn rewards_stay_in_unit_range() {
    let mut env = make_env(EnvConfig {
        num_envs: 2,
        envs_per_row: 2,
        ..single_env_config()
    });
    enter_sit_step(&mut env);
    let mut f = frame(&env, [1.0, 0.5, 0.89], [1.5, 0.2, 0.6]);
    f.root_rot[1] = [0.0, 0.0, 0.7071067811865476, 0.7071067811865476];
    for _ in 0..5 {
        let out = env.step(&f).expect("frame is valid");
        assert!(out.rewards.iter().all(|r| r.is_finite() && (0.0..=1.0).contains(r)));
    }
}

#[test]
fn new_compiles_plans_from_assets() {
    let mut vertices = Vec::new();
    let mut seg_indices = Vec::new();
    for i in 0..20 {
        for j in 0..20 {
            vertices.push([i as f64 * 0.2, j as f64 * 0.2, 0.0]);
            seg_indices.push(1);
        }
    }
    for i in 0..5 {
        vertices.push([2.0 + i as f64 * 0.1, 2.0, 0.45]);
        seg_indices.push(5);
    }
    let scene = SceneAssets {
        vertices,
        seg_indices,
        seg_groups: vec![
            SegmentGroup {
                segments: vec![1],
                ..SegmentGroup::default()
            },
            SegmentGroup {
                segments: vec![5],
                ..SegmentGroup::default()
            },
        ],
    };
    let plans = parse_plan_set(
        r#"{
        "sit": {
            "scene_id": "t",
            "init_pos": [0.5, 0.5, 0.9],
            "obj": {
                "001": {"id": 1, "name": "chair", "part_id": {"seat": [0]},
                        "stand_point": [[2.0, 1.5, 0.0]]}
            },
            "contact_pairs": [
                [["chair001", "none", "none", "none", "none"]],
                [["chair001", "seat", "pelvis", "contact", "up"]]
            ]
        }
    }"#,
    )
    .expect("plan parses");
    let assets = AssetSet::from([("t".to_string(), scene)]);
    let config = EnvConfig {
        num_envs: 2,
        envs_per_row: 2,
        ..single_env_config()
    };
    let mut env = ContactEnv::new(config, &plans, &assets).expect("env builds");
    assert_eq!(env.tables().len(), 1);
    assert_eq!(env.state().stand_point[0], [2.0, 1.5, 0.0]);

    let poses = env.reset_all();
    assert_eq!(poses[0].position, [0.5, 0.5, 0.89]);
    assert_eq!(poses[1].position, [0.5 - 10.0, 0.5, 0.89]);
}

/// Near-contact reward for a step whose only valid slot scores `slot`,
/// without the facing term.
fn single_slot_near_reward(slot: f64) -> f64 {
    let mut slots = [1.0; JOINT_NUM];
    slots[0] = slot;
    soft_combine([1.0, soft_combine(slots)])
}

#[test]
fn wrong_approach_direction_adds_penalty() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    env.state.contact_direction[0][PELVIS] = [0.0, 0.0, 1.0];

    // Pelvis 0.2 below the seat approaches from underneath.
    let below = frame(&env, [2.0, 0.0, 0.89], [2.0, 0.0, 0.3]);
    let out = env.step(&below).expect("frame is valid");
    assert_abs_diff_eq!(env.state().joint_diff[0][PELVIS], 0.04 + 1.0, epsilon = 1e-9);
    assert!(!env.step_fulfilled(0));
    let r = (-5.0 * 0.04_f64).exp();
    let expected = single_slot_near_reward(soft_combine([r, 0.0]));
    assert_abs_diff_eq!(out.rewards[0], expected, epsilon = 1e-9);

    let above = frame(&env, [2.0, 0.0, 0.89], [2.0, 0.0, 0.7]);
    let out = env.step(&above).expect("frame is valid");
    assert_abs_diff_eq!(env.state().joint_diff[0][PELVIS], 0.04, epsilon = 1e-9);
    assert!(env.step_fulfilled(0));
    let expected = single_slot_near_reward(soft_combine([r, 1.0]));
    assert_abs_diff_eq!(out.rewards[0], expected, epsilon = 1e-9);
}

#[test]
fn missing_direction_counts_as_satisfied() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    assert_eq!(env.state().contact_direction[0][PELVIS], [0.0; 3]);

    let below = frame(&env, [2.0, 0.0, 0.89], [2.0, 0.0, 0.3]);
    let out = env.step(&below).expect("frame is valid");
    assert_abs_diff_eq!(env.state().joint_diff[0][PELVIS], 0.04, epsilon = 1e-9);
    let r = (-5.0 * 0.04_f64).exp();
    let expected = single_slot_near_reward(soft_combine([r, 1.0]));
    assert_abs_diff_eq!(out.rewards[0], expected, epsilon = 1e-9);
}

#[test]
fn no_contact_slot_ignores_direction() {
    let mut env = make_env(single_env_config());
    enter_sit_step(&mut env);
    env.state.contact_type[0][PELVIS] = false;
    env.state.contact_direction[0][PELVIS] = [0.0, 0.0, 1.0];

    let below = frame(&env, [2.0, 0.0, 0.89], [2.0, 0.0, 0.3]);
    let out = env.step(&below).expect("frame is valid");
    assert_abs_diff_eq!(env.state().joint_diff[0][PELVIS], 0.04, epsilon = 1e-9);
    let r = (-5.0 * 0.04_f64).exp();
    let expected = single_slot_near_reward(soft_combine([1.0 - r, 1.0]));
    assert_abs_diff_eq!(out.rewards[0], expected, epsilon = 1e-9);
}

#[test]
fn velocity_term_is_zero_when_moving_away() {
    let mut env = make_env(single_env_config());
    env.state.prev_root_pos[0] = [0.1, 0.0, 0.89];
    let f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    let out = env.step(&f).expect("frame is valid");
    let pos = (-5.0 * (4.0 + 0.89 * 0.89_f64)).exp();
    assert_abs_diff_eq!(out.rewards[0], soft_combine([pos, 0.0, 1.0]), epsilon = 1e-9);
}

#[test]
fn velocity_term_rewards_target_speed_toward_stand_point() {
    let mut env = make_env(single_env_config());
    env.state.prev_root_pos[0] = [-1.0 / 30.0, 0.0, 0.89];
    let f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    let out = env.step(&f).expect("frame is valid");
    let pos = (-5.0 * (4.0 + 0.89 * 0.89_f64)).exp();
    assert_abs_diff_eq!(out.rewards[0], soft_combine([pos, 1.0, 1.0]), epsilon = 1e-9);
}

#[test]
fn velocity_and_facing_saturate_near_stand_point() {
    let mut env = make_env(single_env_config());
    env.state.prev_root_pos[0] = [2.0, 0.0, 0.3];
    let mut f = frame(&env, [2.0, 0.0, 0.3], [2.0, 0.0, 0.3]);
    // Standing still and facing away from the target.
    f.root_rot[0] = [0.0, 0.0, 1.0, 0.0];
    let out = env.step(&f).expect("frame is valid");
    let pos = (-5.0 * 0.09_f64).exp();
    assert_abs_diff_eq!(out.rewards[0], soft_combine([pos, 1.0, 1.0]), epsilon = 1e-9);
}

/// Contact step with `slots` valid, each targeting 200 copies of `point`.
fn enter_hand_step(env: &mut ContactEnv, slots: &[usize], point: [f64; 3]) {
    enter_sit_step(env);
    env.state.contact_valid[0] = [false; JOINT_NUM];
    env.state.contact_type[0] = [false; JOINT_NUM];
    for &slot in slots {
        env.state.contact_valid[0][slot] = true;
        env.state.contact_type[0][slot] = true;
        env.state.part_points[0][slot * POINTS_PER_PART..(slot + 1) * POINTS_PER_PART].fill(point);
    }
}

#[test]
fn facing_term_applies_to_a_lone_hand_contact() {
    let target = [3.0, 1.0, 0.5];
    let mut env = make_env(single_env_config());
    enter_hand_step(&mut env, &[LEFT_HAND], target);

    // Root at (2, 0) facing +x; the target sits 45 degrees to the left.
    let f = frame(&env, [2.0, 0.0, 0.89], [3.0, 1.0, 0.7]);
    let out = env.step(&f).expect("frame is valid");
    let r = (-5.0 * 0.04_f64).exp();
    let mut slots = [1.0; JOINT_NUM];
    slots[LEFT_HAND] = soft_combine([r, 1.0]);
    let obj_facing = std::f64::consts::FRAC_1_SQRT_2;
    let expected = soft_combine([obj_facing, soft_combine(slots)]);
    assert_abs_diff_eq!(out.rewards[0], expected, epsilon = 1e-9);
}

#[test]
fn facing_term_is_neutral_with_several_contacts() {
    let target = [3.0, 1.0, 0.5];
    let mut env = make_env(single_env_config());
    enter_hand_step(&mut env, &[LEFT_HAND, RIGHT_HAND], target);

    let f = frame(&env, [2.0, 0.0, 0.89], [3.0, 1.0, 0.7]);
    let out = env.step(&f).expect("frame is valid");
    let r = (-5.0 * 0.04_f64).exp();
    let mut slots = [1.0; JOINT_NUM];
    slots[LEFT_HAND] = soft_combine([r, 1.0]);
    slots[RIGHT_HAND] = soft_combine([r, 1.0]);
    let expected = soft_combine([1.0, soft_combine(slots)]);
    assert_abs_diff_eq!(out.rewards[0], expected, epsilon = 1e-9);
}

#[test]
fn joint_pair_slot_tracks_the_paired_joint() {
    let mut env = make_env(single_env_config());
    enter_hand_step(&mut env, &[LEFT_HAND], [0.0; 3]);
    env.state.joint_pairs[0][LEFT_HAND] = RIGHT_HAND;
    env.state.joint_pairs_valid[0][LEFT_HAND] = true;
    let left_body = env.config.strike_body_ids[LEFT_HAND];
    let right_body = env.config.strike_body_ids[RIGHT_HAND];

    let mut f = frame(&env, [0.0, 0.0, 0.89], [0.0, 0.0, 0.89]);
    f.body_pos[left_body] = [1.0, 0.0, 1.0];
    f.body_pos[right_body] = [1.0, 0.3, 1.0];
    env.step(&f).expect("frame is valid");
    assert_abs_diff_eq!(env.state().joint_diff[0][LEFT_HAND], 0.09, epsilon = 1e-9);
    assert!(matches!(
        env.state().slot_targets(0, LEFT_HAND),
        SlotTargets::Joint(p) if p == [1.0, 0.3, 1.0]
    ));

    f.body_pos[right_body] = [1.0, 0.0, 1.1];
    env.step(&f).expect("frame is valid");
    assert_abs_diff_eq!(env.state().joint_diff[0][LEFT_HAND], 0.01, epsilon = 1e-9);
    assert!(env.step_fulfilled(0));
}
