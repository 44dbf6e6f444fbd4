//! Humanoid joint slots and contact directions.
//!
//! Joint slots index every per-joint buffer (`[JOINT_NUM]` wide). The slot
//! order is fixed; plan files refer to joints by name.

use serde::{Deserialize, Serialize};

use crate::constants::JOINT_NUM;

/// Joint names in slot order.
pub const JOINT_NAMES: [&str; JOINT_NUM] = [
    "pelvis",
    "left_hip",
    "left_knee",
    "left_foot",
    "right_hip",
    "right_knee",
    "right_foot",
    "torso",
    "head",
    "left_shoulder",
    "left_elbow",
    "left_hand",
    "right_shoulder",
    "right_elbow",
    "right_hand",
];

/// Resolve a joint name to its slot index.
pub fn joint_index(name: &str) -> Option<usize> {
    JOINT_NAMES.iter().position(|&n| n == name)
}

/// Required approach direction for a contact constraint, in scene axes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Front,
    Back,
    #[default]
    None,
}

impl Direction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Unit vector for this direction; zero for [`Direction::None`].
    pub fn vector(self) -> [f64; 3] {
        match self {
            Self::Up => [0.0, 0.0, 1.0],
            Self::Down => [0.0, 0.0, -1.0],
            Self::Left => [0.0, 1.0, 0.0],
            Self::Right => [0.0, -1.0, 0.0],
            Self::Front => [1.0, 0.0, 0.0],
            Self::Back => [-1.0, 0.0, 0.0],
            Self::None => [0.0, 0.0, 0.0],
        }
    }
}
