//! The animation state record

use std::time::Duration;

use crate::creature::Creature;
use crate::theme::EffectiveTheme;

use super::speed::SpeedPolicy;

/// Everything the engine animates from
///
/// Only [`AnimationEngine`](super::AnimationEngine) mutates this, always
/// under its state lock. Readers get copies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    /// Runner on display
    pub creature: Creature,
    /// Theme variant on display
    pub effective_theme: EffectiveTheme,
    /// Active speed policy
    pub speed_policy: SpeedPolicy,
    /// Index into the current frame set
    pub frame_index: usize,
    /// Most recent CPU reading in percent
    pub last_cpu: f64,
    /// Delay before the next tick
    pub interval: Duration,
    /// Check state of "Start at Login"
    pub autostart: bool,
}

impl AnimationState {
    /// Initial state: frame 0, no load seen yet
    #[must_use]
    pub fn new(creature: Creature, effective_theme: EffectiveTheme, speed_policy: SpeedPolicy) -> Self {
        Self {
            creature,
            effective_theme,
            speed_policy,
            frame_index: 0,
            last_cpu: 0.0,
            interval: speed_policy.interval(0.0),
            autostart: false,
        }
    }

    /// Step to the next frame of a set of `frame_count`, wrapping to 0
    pub(crate) fn advance(&mut self, frame_count: usize) {
        let next = self.frame_index + 1;
        self.frame_index = if next >= frame_count { 0 } else { next };
    }

    /// Pull the index back inside a set of `frame_count`
    pub(crate) fn clamp_index(&mut self, frame_count: usize) {
        self.frame_index = self.frame_index.min(frame_count.saturating_sub(1));
    }

    /// Recompute the tick interval from the policy and last reading
    pub(crate) fn recompute_interval(&mut self) {
        self.interval = self.speed_policy.interval(self.last_cpu);
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(Creature::default(), EffectiveTheme::default(), SpeedPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::speed::{SpeedCap, MIN_INTERVAL};

    #[test]
    fn test_defaults() {
        let state = AnimationState::default();
        assert_eq!(state.creature, Creature::Cat);
        assert_eq!(state.effective_theme, EffectiveTheme::Light);
        assert_eq!(state.speed_policy, SpeedPolicy::Adaptive);
        assert_eq!(state.frame_index, 0);
        assert_eq!(state.interval, Duration::from_millis(200));
    }

    #[test]
    fn test_advance_wraps_after_n_steps() {
        for count in 1..=14 {
            let mut state = AnimationState::default();
            state.frame_index = count / 2;
            let start = state.frame_index;
            for _ in 0..count {
                state.advance(count);
                assert!(state.frame_index < count);
            }
            assert_eq!(state.frame_index, start);
        }
    }

    #[test]
    fn test_advance_recovers_from_out_of_range_index() {
        let mut state = AnimationState::default();
        state.frame_index = 9;
        state.advance(5);
        assert_eq!(state.frame_index, 0);
    }

    #[test]
    fn test_clamp_index() {
        let mut state = AnimationState::default();
        state.frame_index = 12;
        state.clamp_index(10);
        assert_eq!(state.frame_index, 9);
        state.clamp_index(14);
        assert_eq!(state.frame_index, 9);
        state.clamp_index(0);
        assert_eq!(state.frame_index, 0);
    }

    #[test]
    fn test_recompute_interval_follows_policy() {
        let mut state = AnimationState::default();
        state.last_cpu = 60.0;
        state.recompute_interval();
        assert_eq!(state.interval, MIN_INTERVAL);

        state.speed_policy = SpeedPolicy::Fixed(SpeedCap::Cpu10);
        state.recompute_interval();
        assert_eq!(state.interval, Duration::from_millis(100));
    }
}
