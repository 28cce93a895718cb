//! Hand landmark model: named points and per-frame hand sets.

use serde::{Deserialize, Serialize};

/// Number of points the extractor emits for a complete hand.
pub const LANDMARK_COUNT: usize = 21;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point {
    #[cfg(test)]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Named hand points, in extractor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
#[allow(dead_code)]
pub enum Landmark {
    Wrist = 0,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl Landmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Handedness {
    Left,
    Right,
}

/// One detected hand in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    pub points: Vec<Point>,
    pub handedness: Option<Handedness>,
    pub score: Option<f32>,
}

impl LandmarkSet {
    #[cfg(test)]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// `None` when the set is too short to hold `lm`.
    pub fn point(&self, lm: Landmark) -> Option<Point> {
        self.points.get(lm.index()).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= LANDMARK_COUNT
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub timestamp_ms: u64,
    pub hands: Vec<LandmarkSet>,
}
