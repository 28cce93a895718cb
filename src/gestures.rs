use serde::Serialize;
use std::fmt;

use crate::landmarks::{Landmark, LandmarkSet};

/// Normalized vertical distance the four fingertips must clear the wrist by.
pub const FINGER_MARGIN: f32 = 0.1;

const FINGERTIPS: [Landmark; 4] = [
    Landmark::IndexTip,
    Landmark::MiddleTip,
    Landmark::RingTip,
    Landmark::PinkyTip,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    #[default]
    None,
    HandOpen,
    FistClosed,
    ThumbUp,
    ThumbDown,
    SwipeLeft,
    SwipeRight,
}

impl GestureLabel {
    pub fn caption(self) -> &'static str {
        match self {
            Self::None => "No Gesture Detected",
            Self::HandOpen => "Hand Open (Increase Brightness)",
            Self::FistClosed => "Fist (Decrease Brightness)",
            Self::ThumbUp => "Thumbs Up (Increase Volume)",
            Self::ThumbDown => "Thumbs Down (Decrease Volume)",
            Self::SwipeLeft => "Swipe Left (Switch Tabs)",
            Self::SwipeRight => "Swipe Right (Switch Tabs)",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caption())
    }
}

/// Static pose of one hand. First matching rule wins; a set missing any
/// of the required points is `None`.
pub fn classify(hand: &LandmarkSet) -> GestureLabel {
    let Some(wrist) = hand.point(Landmark::Wrist) else {
        return GestureLabel::None;
    };
    let (Some(thumb_tip), Some(thumb_ip)) =
        (hand.point(Landmark::ThumbTip), hand.point(Landmark::ThumbIp))
    else {
        return GestureLabel::None;
    };
    let mut tips = [0.0f32; 4];
    for (slot, lm) in tips.iter_mut().zip(FINGERTIPS) {
        match hand.point(lm) {
            Some(p) => *slot = p.y,
            None => return GestureLabel::None,
        }
    }

    // y grows downward: "above the wrist" means smaller y
    if tips.iter().all(|&y| y < wrist.y - FINGER_MARGIN) {
        GestureLabel::HandOpen
    } else if tips.iter().all(|&y| y > wrist.y + FINGER_MARGIN) {
        GestureLabel::FistClosed
    } else if thumb_tip.y < thumb_ip.y {
        GestureLabel::ThumbUp
    } else if thumb_tip.y > thumb_ip.y {
        GestureLabel::ThumbDown
    } else {
        GestureLabel::None
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::landmarks::{LANDMARK_COUNT, Landmark, LandmarkSet, Point};

    /// Complete hand with every point at (0.5, 0.5).
    pub fn flat_hand() -> LandmarkSet {
        LandmarkSet::from_points(vec![Point::new(0.5, 0.5); LANDMARK_COUNT])
    }

    pub fn set_y(hand: &mut LandmarkSet, lm: Landmark, y: f32) {
        hand.points[lm.index()].y = y;
    }

    pub fn set_x(hand: &mut LandmarkSet, lm: Landmark, x: f32) {
        hand.points[lm.index()].x = x;
    }

    pub fn with_fingertips(wrist_y: f32, tip_y: f32) -> LandmarkSet {
        let mut hand = flat_hand();
        set_y(&mut hand, Landmark::Wrist, wrist_y);
        for lm in super::FINGERTIPS {
            set_y(&mut hand, lm, tip_y);
        }
        hand
    }

    pub fn open_hand() -> LandmarkSet {
        with_fingertips(0.8, 0.4)
    }

    pub fn fist() -> LandmarkSet {
        with_fingertips(0.3, 0.6)
    }

    pub fn thumb(up: bool) -> LandmarkSet {
        let mut hand = flat_hand();
        set_y(&mut hand, Landmark::ThumbIp, 0.5);
        set_y(&mut hand, Landmark::ThumbTip, if up { 0.4 } else { 0.6 });
        hand
    }
}
