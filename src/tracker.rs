//! Horizontal swipe detection on the index fingertip.

use std::collections::HashMap;

use crate::gestures::GestureLabel;
use crate::landmarks::{Handedness, LandmarkSet};

/// Minimum x travel (normalized width) inside the window.
pub const SWIPE_MIN_DISTANCE: f32 = 0.2;
/// Origin samples older than this are discarded.
pub const SWIPE_WINDOW_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    pub x: f32,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwipeState {
    pub origin: Option<Origin>,
}

/// One step of the swipe state machine.
pub fn observe(state: SwipeState, x: f32, now_ms: u64) -> (SwipeState, Option<GestureLabel>) {
    let Some(origin) = state.origin else {
        let started = SwipeState {
            origin: Some(Origin { x, at_ms: now_ms }),
        };
        return (started, None);
    };

    if now_ms.saturating_sub(origin.at_ms) >= SWIPE_WINDOW_MS {
        return (SwipeState::default(), None);
    }

    let dx = x - origin.x;
    if dx > SWIPE_MIN_DISTANCE {
        (SwipeState::default(), Some(GestureLabel::SwipeRight))
    } else if dx < -SWIPE_MIN_DISTANCE {
        (SwipeState::default(), Some(GestureLabel::SwipeLeft))
    } else {
        (state, None)
    }
}

/// Stable identity of a hand across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandKey {
    Side(Handedness),
    Slot(usize),
}

impl HandKey {
    pub fn of(slot: usize, hand: &LandmarkSet) -> Self {
        match hand.handedness {
            Some(side) => Self::Side(side),
            None => Self::Slot(slot),
        }
    }
}

#[derive(Debug, Default)]
pub struct SwipeTracker {
    hands: HashMap<HandKey, SwipeState>,
}

impl SwipeTracker {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, key: HandKey, x: f32, now_ms: u64) -> Option<GestureLabel> {
        let state = self.hands.entry(key).or_default();
        let (next, swipe) = observe(*state, x, now_ms);
        *state = next;
        swipe
    }

    #[cfg(test)]
    pub fn state(&self, key: HandKey) -> SwipeState {
        self.hands.get(&key).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(x: f32, at_ms: u64) -> SwipeState {
        observe(SwipeState::default(), x, at_ms).0
    }

    #[test]
    fn first_sample_records_origin() {
        let (st, swipe) = observe(SwipeState::default(), 0.3, 0);
        assert_eq!(swipe, None);
        assert_eq!(st.origin, Some(Origin { x: 0.3, at_ms: 0 }));
    }

    #[test]
    fn quick_move_right_is_a_swipe() {
        let (st, swipe) = observe(armed(0.3, 0), 0.55, 200);
        assert_eq!(swipe, Some(GestureLabel::SwipeRight));
        assert_eq!(st.origin, None);
    }

    #[test]
    fn quick_move_left_is_a_swipe() {
        let (st, swipe) = observe(armed(0.7, 0), 0.45, 100);
        assert_eq!(swipe, Some(GestureLabel::SwipeLeft));
        assert_eq!(st.origin, None);
    }

    #[test]
    fn stale_origin_is_dropped_even_with_enough_travel() {
        let (st, swipe) = observe(armed(0.3, 0), 0.6, 600);
        assert_eq!(swipe, None);
        assert_eq!(st.origin, None);

        // exactly at the window edge counts as stale
        let (st, swipe) = observe(armed(0.3, 0), 0.6, SWIPE_WINDOW_MS);
        assert_eq!(swipe, None);
        assert_eq!(st.origin, None);
    }

    #[test]
    fn small_motion_keeps_origin() {
        let start = armed(0.3, 0);
        let (st, swipe) = observe(start, 0.45, 300);
        assert_eq!(swipe, None);
        assert_eq!(st, start);
    }

    #[test]
    fn backwards_clock_does_not_expire_origin() {
        let (st, swipe) = observe(armed(0.3, 1_000), 0.31, 900);
        assert_eq!(swipe, None);
        assert!(st.origin.is_some());
    }

    #[test]
    fn tracker_keeps_hands_apart() {
        let mut tr = SwipeTracker::new();
        let left = HandKey::Side(Handedness::Left);
        let right = HandKey::Side(Handedness::Right);

        assert_eq!(tr.update(left, 0.2, 0), None);
        assert_eq!(tr.update(right, 0.8, 0), None);
        assert_eq!(tr.update(right, 0.75, 100), None);
        assert_eq!(tr.update(left, 0.5, 200), Some(GestureLabel::SwipeRight));
        assert_eq!(tr.state(left).origin, None);
        assert!(tr.state(right).origin.is_some());
    }

    #[test]
    fn hand_key_prefers_handedness() {
        let mut hand = LandmarkSet::default();
        assert_eq!(HandKey::of(1, &hand), HandKey::Slot(1));
        hand.handedness = Some(Handedness::Right);
        assert_eq!(HandKey::of(1, &hand), HandKey::Side(Handedness::Right));
    }
}
