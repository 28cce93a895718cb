//! Cooldown gate for pose-triggered actions.

use crate::gestures::GestureLabel;

/// Minimum interval between two gate openings.
pub const COOLDOWN_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    BrightnessUp,
    BrightnessDown,
    VolumeUp,
    VolumeDown,
    SwitchApplication,
}

impl Action {
    /// Pose actions only; swipes are fired by the tracker path.
    pub fn for_pose(label: GestureLabel) -> Option<Self> {
        match label {
            GestureLabel::HandOpen => Some(Self::BrightnessUp),
            GestureLabel::FistClosed => Some(Self::BrightnessDown),
            GestureLabel::ThumbUp => Some(Self::VolumeUp),
            GestureLabel::ThumbDown => Some(Self::VolumeDown),
            GestureLabel::None | GestureLabel::SwipeLeft | GestureLabel::SwipeRight => None,
        }
    }
}

/// Shared by every pose action. A fresh state is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    pub last_action_ms: Option<u64>,
}

impl CooldownState {
    pub fn is_open(&self, now_ms: u64) -> bool {
        match self.last_action_ms {
            Some(last) => now_ms.saturating_sub(last) > COOLDOWN_MS,
            None => true,
        }
    }
}

/// Once the gate is open the timer restarts at `now_ms`, whether or not
/// `label` maps to an action.
pub fn gate(state: CooldownState, label: GestureLabel, now_ms: u64) -> (CooldownState, Option<Action>) {
    if !state.is_open(now_ms) {
        return (state, None);
    }
    let next = CooldownState {
        last_action_ms: Some(now_ms),
    };
    (next, Action::for_pose(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_open_sequence_respects_cooldown() {
        let st = CooldownState::default();

        let (st, act) = gate(st, GestureLabel::HandOpen, 0);
        assert_eq!(act, Some(Action::BrightnessUp));
        assert_eq!(st.last_action_ms, Some(0));

        let (st, act) = gate(st, GestureLabel::HandOpen, 1_000);
        assert_eq!(act, None);
        assert_eq!(st.last_action_ms, Some(0));

        let (st, act) = gate(st, GestureLabel::HandOpen, 2_100);
        assert_eq!(act, Some(Action::BrightnessUp));
        assert_eq!(st.last_action_ms, Some(2_100));
    }

    #[test]
    fn gate_is_closed_on_the_boundary() {
        let st = CooldownState {
            last_action_ms: Some(500),
        };
        assert!(!st.is_open(500 + COOLDOWN_MS));
        assert!(st.is_open(501 + COOLDOWN_MS));
    }

    #[test]
    fn none_resets_timer_without_action() {
        let (st, act) = gate(CooldownState::default(), GestureLabel::None, 3_000);
        assert_eq!(act, None);
        assert_eq!(st.last_action_ms, Some(3_000));

        // the reset holds off a pose that follows shortly after
        let (_, act) = gate(st, GestureLabel::ThumbUp, 4_000);
        assert_eq!(act, None);
    }

    #[test]
    fn repeated_none_never_acts() {
        let mut st = CooldownState::default();
        for t in (0..20_000).step_by(700) {
            let (next, act) = gate(st, GestureLabel::None, t);
            assert_eq!(act, None);
            st = next;
        }
    }

    #[test]
    fn pose_mapping() {
        assert_eq!(Action::for_pose(GestureLabel::FistClosed), Some(Action::BrightnessDown));
        assert_eq!(Action::for_pose(GestureLabel::ThumbUp), Some(Action::VolumeUp));
        assert_eq!(Action::for_pose(GestureLabel::ThumbDown), Some(Action::VolumeDown));
        assert_eq!(Action::for_pose(GestureLabel::SwipeRight), None);
    }
}
