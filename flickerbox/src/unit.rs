// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::errors::{check_frequency, Result};
use crate::timing::{FlickerClock, Tick, TimingPolicy};

/// A single flickering box. Units start in the "on" state and alternate
/// between fully visible and fully hidden, never anything in between.
#[derive(Debug, Clone, PartialEq)]
pub struct FlickerUnit {
    label: String,
    frequency: f64,
    on: bool,
    clock: FlickerClock,
    toggles: u64,
}

impl FlickerUnit {
    /// Create a new unit flickering at `frequency` Hz.
    pub fn new(label: impl Into<String>, frequency: f64, policy: &TimingPolicy) -> Result<Self> {
        let frequency = check_frequency(frequency)?;
        Ok(Self {
            label: label.into(),
            frequency,
            on: true,
            clock: FlickerClock::new(policy, frequency),
            toggles: 0,
        })
    }

    /// Change frequency and label. If the frequency is invalid, nothing changes.
    ///
    /// The current phase is kept: the on/off state and the time (or ticks)
    /// spent in it carry over, only the half period changes. If the unit has
    /// already been in its state for longer than the new half period, it
    /// toggles once on the next tick, as long as that tick is shorter than the
    /// new half period. Use [`FlickerUnit::reset_phase`] to restart from a
    /// known state instead.
    pub fn configure(&mut self, frequency: f64, label: impl Into<String>) -> Result<()> {
        let frequency = check_frequency(frequency)?;
        self.frequency = frequency;
        self.label = label.into();
        self.clock.retune(frequency);
        log::debug!(
            "Unit '{}' set to {} Hz (half period {:.4} s)",
            self.label,
            self.frequency,
            self.clock.half_period_secs()
        );
        Ok(())
    }

    /// Force the unit on and clear its accumulated time.
    pub fn reset_phase(&mut self) {
        self.on = true;
        self.clock.reset();
    }

    /// Advance the unit by one tick. Has no effect if the tick is not running.
    pub fn advance(&mut self, tick: &Tick) {
        if !tick.running {
            return;
        }

        let toggles = self.clock.advance(tick.sanitized_dt());
        if toggles % 2 == 1 {
            self.on = !self.on;
        }
        self.toggles += toggles;
    }

    /// Whether the box is visible this frame.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// The opacity to paint the box with, either exactly 1.0 or exactly 0.0.
    pub fn opacity(&self) -> f32 {
        if self.on {
            1.0
        } else {
            0.0
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn half_period_secs(&self) -> f64 {
        self.clock.half_period_secs()
    }

    pub fn threshold_ticks(&self) -> Option<u64> {
        self.clock.threshold_ticks()
    }

    /// Number of times the unit has changed state since it was created.
    pub fn toggles(&self) -> u64 {
        self.toggles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlickerError;
    use proptest::prelude::*;

    fn running(dt_seconds: f64, index: u64) -> Tick {
        Tick {
            dt_seconds,
            index,
            running: true,
        }
    }

    #[test]
    fn ten_hz_at_sixty_ticks() {
        let policy = TimingPolicy::tick_count(60.0).unwrap();
        let mut unit = FlickerUnit::new("A", 10.0, &policy).unwrap();
        assert_eq!(unit.threshold_ticks(), Some(3));
        assert!(unit.is_on());

        for i in 0..2 {
            unit.advance(&running(1.0 / 60.0, i));
            assert!(unit.is_on());
        }
        unit.advance(&running(1.0 / 60.0, 2));
        assert!(!unit.is_on());
        assert_eq!(unit.opacity(), 0.0);

        for i in 3..6 {
            unit.advance(&running(1.0 / 60.0, i));
        }
        assert!(unit.is_on());
        assert_eq!(unit.opacity(), 1.0);
        assert_eq!(unit.toggles(), 2);
    }

    #[test]
    fn stopped_ticks_are_ignored() {
        let mut unit = FlickerUnit::new("A", 10.0, &TimingPolicy::default()).unwrap();
        let tick = Tick {
            dt_seconds: 1.0,
            index: 0,
            running: false,
        };
        for _ in 0..10 {
            unit.advance(&tick);
        }
        assert!(unit.is_on());
        assert_eq!(unit.toggles(), 0);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        assert!(matches!(
            FlickerUnit::new("A", 0.0, &TimingPolicy::default()),
            Err(FlickerError::InvalidFrequency(_))
        ));
        assert!(FlickerUnit::new("A", -3.0, &TimingPolicy::default()).is_err());
        assert!(FlickerUnit::new("A", f64::INFINITY, &TimingPolicy::default()).is_err());
    }

    #[test]
    fn failed_configure_changes_nothing() {
        let mut unit = FlickerUnit::new("Banana", 20.0, &TimingPolicy::default()).unwrap();
        unit.advance(&running(0.01, 0));
        let before = unit.clone();

        assert!(unit.configure(0.0, "X").is_err());
        assert_eq!(unit, before);
    }

    #[test]
    fn configure_recomputes_half_period_and_keeps_phase() {
        let mut unit = FlickerUnit::new("Banana", 20.0, &TimingPolicy::default()).unwrap();
        unit.advance(&running(0.03, 0));
        assert!(!unit.is_on());

        unit.configure(5.0, "Kiwi").unwrap();
        assert_eq!(unit.label(), "Kiwi");
        assert_eq!(unit.frequency(), 5.0);
        assert!((unit.half_period_secs() - 0.1).abs() < 1e-12);
        // the state reached before the change is kept
        assert!(!unit.is_on());
    }

    #[test]
    fn speeding_up_mid_phase_toggles_on_the_next_tick() {
        let mut unit = FlickerUnit::new("A", 1.0, &TimingPolicy::default()).unwrap();
        unit.advance(&running(0.49, 0));
        assert!(unit.is_on());

        unit.configure(20.0, "A").unwrap();
        unit.advance(&running(1.0 / 60.0, 1));
        assert!(!unit.is_on());
        assert_eq!(unit.toggles(), 1);

        // the 16.7 ms left over counts towards the regular 25 ms half period
        unit.advance(&running(0.005, 2));
        assert!(!unit.is_on());
        unit.advance(&running(0.005, 3));
        assert!(unit.is_on());
        assert_eq!(unit.toggles(), 2);
    }

    #[test]
    fn speeding_up_under_tick_count_toggles_once() {
        let policy = TimingPolicy::tick_count(60.0).unwrap();
        let mut unit = FlickerUnit::new("A", 1.0, &policy).unwrap();
        for i in 0..20 {
            unit.advance(&running(1.0 / 60.0, i));
        }
        assert!(unit.is_on());

        unit.configure(10.0, "A").unwrap();
        unit.advance(&running(1.0 / 60.0, 20));
        assert!(!unit.is_on());
        assert_eq!(unit.toggles(), 1);
    }

    #[test]
    fn reset_phase_forces_on() {
        let mut unit = FlickerUnit::new("A", 10.0, &TimingPolicy::default()).unwrap();
        unit.advance(&running(0.05, 0));
        assert!(!unit.is_on());
        unit.reset_phase();
        assert!(unit.is_on());
        unit.advance(&running(0.04, 1));
        assert!(unit.is_on());
    }

    proptest! {
        #[test]
        fn one_period_in_any_split_toggles_twice(
            frequency in 0.5f64..120.0,
            weights in prop::collection::vec(0.01f64..1.0, 1..40),
        ) {
            let mut unit = FlickerUnit::new("A", frequency, &TimingPolicy::default()).unwrap();
            let initial = unit.is_on();
            let period = 1.0 / frequency;
            let total: f64 = weights.iter().sum();

            for (i, w) in weights.iter().enumerate() {
                unit.advance(&running(w / total * period, i as u64));
            }

            prop_assert_eq!(unit.toggles(), 2);
            prop_assert_eq!(unit.is_on(), initial);
        }

        #[test]
        fn tick_count_is_deterministic(
            frequency in 0.5f64..60.0,
            ticks in 1usize..600,
        ) {
            let policy = TimingPolicy::tick_count(60.0).unwrap();
            let mut a = FlickerUnit::new("A", frequency, &policy).unwrap();
            let mut b = FlickerUnit::new("B", frequency, &policy).unwrap();
            let threshold = (60.0 / (2.0 * frequency)).round().max(1.0) as u64;
            prop_assert_eq!(a.threshold_ticks(), Some(threshold));

            let mut last_toggle = 0u64;
            for i in 0..ticks as u64 {
                let before = a.is_on();
                a.advance(&running(1.0 / 60.0, i));
                b.advance(&running(1.0 / 60.0, i));
                prop_assert_eq!(a.is_on(), b.is_on());
                if a.is_on() != before {
                    prop_assert_eq!(i + 1 - last_toggle, threshold);
                    last_toggle = i + 1;
                }
            }
        }
    }
}
