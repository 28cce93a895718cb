//! Per-frame evaluation: classification, swipe tracking, cooldown dispatch.

use log::debug;
use serde::Serialize;

use crate::actions::{Direction, ExecutorError, HostActions};
use crate::dispatch::{self, Action, CooldownState};
use crate::gestures::{self, GestureLabel};
use crate::landmarks::{Frame, Landmark};
use crate::tracker::{HandKey, SwipeTracker};

/// What the display surface shows for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub label: GestureLabel,
    pub brightness: u8,
    pub hands: usize,
}

#[derive(Debug, Default)]
pub struct Engine {
    swipes: SwipeTracker,
    cooldown: CooldownState,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor errors are returned as-is; nothing is retried.
    pub fn process<A: HostActions + ?Sized>(
        &mut self,
        frame: &Frame,
        actions: &mut A,
    ) -> Result<FrameReport, ExecutorError> {
        let now = frame.timestamp_ms;
        let mut report = FrameReport {
            label: GestureLabel::None,
            brightness: actions.brightness()?,
            hands: frame.hands.len(),
        };

        for (slot, hand) in frame.hands.iter().enumerate() {
            report.label = gestures::classify(hand);

            if let Some(tip) = hand.point(Landmark::IndexTip) {
                let key = HandKey::of(slot, hand);
                if let Some(swipe) = self.swipes.update(key, tip.x, now) {
                    debug!("{swipe} @{now}ms");
                    execute(Action::SwitchApplication, actions)?;
                    report.label = swipe;
                }
            }

            // a swipe replaces the pose for this hand: it still consumes an
            // open gate but maps to no further action
            let label = report.label;
            let (next, action) = dispatch::gate(self.cooldown, label, now);
            self.cooldown = next;
            if let Some(action) = action {
                debug!("dispatch {action:?} for {label} @{now}ms");
                if let Some(level) = execute(action, actions)? {
                    report.brightness = level;
                }
            }
        }
        Ok(report)
    }

    #[cfg(test)]
    pub fn cooldown(&self) -> CooldownState {
        self.cooldown
    }
}

/// Returns the new brightness for brightness actions.
pub fn execute<A: HostActions + ?Sized>(action: Action, actions: &mut A) -> Result<Option<u8>, ExecutorError> {
    match action {
        Action::BrightnessUp => actions.brightness_increase().map(Some),
        Action::BrightnessDown => actions.brightness_decrease().map(Some),
        Action::VolumeUp => actions.volume(Direction::Up).map(|_| None),
        Action::VolumeDown => actions.volume(Direction::Down).map(|_| None),
        Action::SwitchApplication => actions.switch_application().map(|_| None),
    }
}
