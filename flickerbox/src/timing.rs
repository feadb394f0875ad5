// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Timing policies that decide when a flicker unit toggles.
//!
//! Two strategies are available behind the same [`FlickerClock`] interface:
//!
//! * [`TimingPolicy::ElapsedTime`] (the default) accumulates the measured time
//!   between ticks. It follows the requested frequency regardless of how
//!   regularly the host calls `tick`, and never needs to block.
//! * [`TimingPolicy::TickCount`] counts ticks and assumes every tick lasts exactly
//!   one refresh interval. Half periods are rounded to whole ticks, so frequencies
//!   that do not evenly divide the refresh rate are quantized (see
//!   [`quantized_frequency`]). If the host drops or delays frames, the produced
//!   frequency drifts accordingly.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::{FlickerError, Result};

/// Slack used when comparing accumulated time against a half period, so that
/// `dt` values that sum to a half period up to rounding error still toggle.
const TOLERANCE: f64 = 1e-9;

/// What happens to the time that exceeds a half period when a unit toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Overshoot {
    /// Keep the excess and count it towards the next half period. The mean
    /// period matches the requested frequency.
    #[default]
    Carry,
    /// Discard the excess. The mean period is biased upwards by up to one tick
    /// per half period when ticks are coarse relative to the half period.
    Drop,
}

/// Name of a timing strategy, as used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimingKind {
    #[default]
    Elapsed,
    Ticks,
}

/// Strategy used by every unit of an engine to decide when to toggle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingPolicy {
    /// Accumulate measured `dt` and toggle every `1 / (2 * frequency)` seconds.
    ElapsedTime { overshoot: Overshoot },
    /// Toggle every `round(refresh_rate / (2 * frequency))` ticks.
    TickCount { refresh_rate: f64 },
}

impl Default for TimingPolicy {
    fn default() -> Self {
        TimingPolicy::ElapsedTime {
            overshoot: Overshoot::Carry,
        }
    }
}

impl TimingPolicy {
    /// Create a tick-count policy for a display running at `refresh_rate` Hz.
    pub fn tick_count(refresh_rate: f64) -> Result<Self> {
        if refresh_rate.is_finite() && refresh_rate > 0.0 {
            Ok(TimingPolicy::TickCount { refresh_rate })
        } else {
            Err(FlickerError::InvalidRefreshRate(refresh_rate))
        }
    }

    pub fn kind(&self) -> TimingKind {
        match self {
            TimingPolicy::ElapsedTime { .. } => TimingKind::Elapsed,
            TimingPolicy::TickCount { .. } => TimingKind::Ticks,
        }
    }
}

/// The per-tick input to a unit. The running flag travels with the tick so
/// that units never need to look up the state of their owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Seconds since the previous tick.
    pub dt_seconds: f64,
    /// Number of ticks delivered before this one.
    pub index: u64,
    /// Whether the engine is currently flickering.
    pub running: bool,
}

impl Tick {
    /// `dt` with anything that is not a finite non-negative number treated as zero.
    pub fn sanitized_dt(&self) -> f64 {
        if self.dt_seconds.is_finite() && self.dt_seconds > 0.0 {
            self.dt_seconds
        } else {
            0.0
        }
    }
}

/// Number of ticks a unit spends in one state under the tick-count policy.
///
/// Never less than one tick: frequencies above half the refresh rate cannot be
/// displayed and are rendered at `refresh_rate / 2`.
pub fn threshold_ticks(refresh_rate: f64, frequency: f64) -> u64 {
    let ticks = (refresh_rate / (2.0 * frequency)).round();
    if ticks < 1.0 {
        log::warn!(
            "{} Hz is above half the refresh rate ({} Hz), flickering at {} Hz instead",
            frequency,
            refresh_rate,
            refresh_rate / 2.0
        );
        1
    } else {
        ticks as u64
    }
}

/// The frequency the tick-count policy actually produces for `frequency`.
pub fn quantized_frequency(refresh_rate: f64, frequency: f64) -> f64 {
    refresh_rate / (2.0 * threshold_ticks(refresh_rate, frequency) as f64)
}

/// All frequencies (>= 1 Hz) that the tick-count policy reproduces exactly at
/// `refresh_rate`, from highest to lowest.
pub fn available_frequencies(refresh_rate: f64) -> Vec<f64> {
    // step through all whole numbers of ticks per half period
    (1..)
        .map(|ticks| refresh_rate / (2.0 * ticks as f64))
        .take_while(|freq| *freq >= 1.0)
        .collect()
}

/// Bookkeeping state of one unit's timing policy.
#[derive(Debug, Clone, PartialEq)]
pub enum FlickerClock {
    Elapsed {
        /// Seconds accumulated since the last toggle.
        elapsed: f64,
        half_period: f64,
        overshoot: Overshoot,
        /// Position within the current second, in [0, 1).
        second_phase: f64,
        /// Number of full seconds that have rolled over.
        whole_seconds: u64,
    },
    Frames {
        frames_in_state: u64,
        threshold: u64,
        refresh_rate: f64,
    },
}

impl FlickerClock {
    /// Create a clock for `frequency`, which must already be validated.
    pub fn new(policy: &TimingPolicy, frequency: f64) -> Self {
        match *policy {
            TimingPolicy::ElapsedTime { overshoot } => FlickerClock::Elapsed {
                elapsed: 0.0,
                half_period: 1.0 / (2.0 * frequency),
                overshoot,
                second_phase: 0.0,
                whole_seconds: 0,
            },
            TimingPolicy::TickCount { refresh_rate } => FlickerClock::Frames {
                frames_in_state: 0,
                threshold: threshold_ticks(refresh_rate, frequency),
                refresh_rate,
            },
        }
    }

    /// Recompute the half period for a new frequency. Accumulated time or
    /// frames are kept, but time is capped at the new half period so that an
    /// overdue toggle happens once on the next tick rather than as a burst.
    pub fn retune(&mut self, frequency: f64) {
        match self {
            FlickerClock::Elapsed {
                elapsed,
                half_period,
                ..
            } => {
                *half_period = 1.0 / (2.0 * frequency);
                *elapsed = elapsed.min(*half_period);
            }
            FlickerClock::Frames {
                threshold,
                refresh_rate,
                ..
            } => {
                *threshold = threshold_ticks(*refresh_rate, frequency);
            }
        }
    }

    /// Clear accumulated time or frames.
    pub fn reset(&mut self) {
        match self {
            FlickerClock::Elapsed {
                elapsed,
                second_phase,
                whole_seconds,
                ..
            } => {
                *elapsed = 0.0;
                *second_phase = 0.0;
                *whole_seconds = 0;
            }
            FlickerClock::Frames {
                frames_in_state, ..
            } => *frames_in_state = 0,
        }
    }

    /// Account for one tick lasting `dt` seconds and return how many times the
    /// unit has to toggle.
    pub fn advance(&mut self, dt: f64) -> u64 {
        match self {
            FlickerClock::Elapsed {
                elapsed,
                half_period,
                overshoot,
                second_phase,
                whole_seconds,
            } => {
                *second_phase += dt;
                if *second_phase >= 1.0 {
                    *whole_seconds += second_phase.trunc() as u64;
                    *second_phase = second_phase.fract();
                }

                *elapsed += dt;
                if *elapsed + TOLERANCE < *half_period {
                    return 0;
                }

                match overshoot {
                    Overshoot::Carry => {
                        let toggles = ((*elapsed + TOLERANCE) / *half_period).floor();
                        *elapsed = (*elapsed - toggles * *half_period).max(0.0);
                        toggles as u64
                    }
                    Overshoot::Drop => {
                        *elapsed = 0.0;
                        1
                    }
                }
            }
            FlickerClock::Frames {
                frames_in_state,
                threshold,
                ..
            } => {
                *frames_in_state += 1;
                if *frames_in_state >= *threshold {
                    *frames_in_state = 0;
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Duration of one half period in seconds. For the tick-count policy this
    /// is the quantized duration.
    pub fn half_period_secs(&self) -> f64 {
        match self {
            FlickerClock::Elapsed { half_period, .. } => *half_period,
            FlickerClock::Frames {
                threshold,
                refresh_rate,
                ..
            } => *threshold as f64 / *refresh_rate,
        }
    }

    /// Ticks per half period, if this clock counts ticks.
    pub fn threshold_ticks(&self) -> Option<u64> {
        match self {
            FlickerClock::Frames { threshold, .. } => Some(*threshold),
            FlickerClock::Elapsed { .. } => None,
        }
    }

    /// Full seconds of `dt` accumulated, if this clock measures time.
    pub fn whole_seconds(&self) -> Option<u64> {
        match self {
            FlickerClock::Elapsed { whole_seconds, .. } => Some(*whole_seconds),
            FlickerClock::Frames { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn threshold_matches_refresh_divisors() {
        assert_eq!(threshold_ticks(60.0, 10.0), 3);
        assert_eq!(threshold_ticks(60.0, 15.0), 2);
        assert_eq!(threshold_ticks(60.0, 30.0), 1);
        assert_eq!(threshold_ticks(144.0, 12.0), 6);
    }

    #[test]
    fn threshold_is_clamped_to_one_tick() {
        assert_eq!(threshold_ticks(60.0, 60.0), 1);
        assert_eq!(threshold_ticks(60.0, 500.0), 1);
    }

    #[test]
    fn quantization_error_for_non_divisors() {
        // 60 / (2 * 7) = 4.29 ticks, rounded to 4, which yields 7.5 Hz
        assert_eq!(threshold_ticks(60.0, 7.0), 4);
        assert_eq!(quantized_frequency(60.0, 7.0), 7.5);
        assert_eq!(quantized_frequency(60.0, 10.0), 10.0);
    }

    #[test]
    fn available_frequencies_at_60hz() {
        let freqs = available_frequencies(60.0);
        assert_eq!(freqs.first(), Some(&30.0));
        assert_eq!(freqs.last(), Some(&1.0));
        assert_eq!(freqs.len(), 30);
        assert!(freqs.contains(&10.0));
        assert!(freqs.contains(&7.5));
    }

    #[test]
    fn carry_keeps_the_remainder() {
        let mut clock = FlickerClock::new(&TimingPolicy::default(), 1.0);
        assert_eq!(clock.advance(0.6), 1);
        assert_eq!(clock.advance(0.4), 1);
        assert_eq!(clock.advance(0.4), 0);
    }

    #[test]
    fn carry_toggles_several_times_on_a_long_tick() {
        let mut clock = FlickerClock::new(&TimingPolicy::default(), 10.0);
        // 0.2 s is four half periods of 50 ms
        assert_eq!(clock.advance(0.2), 4);
    }

    #[test]
    fn drop_discards_the_remainder() {
        let policy = TimingPolicy::ElapsedTime {
            overshoot: Overshoot::Drop,
        };
        let mut clock = FlickerClock::new(&policy, 1.0);
        assert_eq!(clock.advance(0.6), 1);
        assert_eq!(clock.advance(0.4), 0);
        assert_eq!(clock.advance(0.1), 1);
    }

    #[test]
    fn rollover_counts_whole_seconds() {
        let mut clock = FlickerClock::new(&TimingPolicy::default(), 5.0);
        for _ in 0..25 {
            clock.advance(0.1);
        }
        assert_eq!(clock.whole_seconds(), Some(2));
        clock.reset();
        assert_eq!(clock.whole_seconds(), Some(0));
    }

    #[test]
    fn retune_recomputes_threshold() {
        let policy = TimingPolicy::tick_count(60.0).unwrap();
        let mut clock = FlickerClock::new(&policy, 10.0);
        assert_eq!(clock.threshold_ticks(), Some(3));
        clock.retune(5.0);
        assert_eq!(clock.threshold_ticks(), Some(6));
        assert!((clock.half_period_secs() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn retune_caps_time_spent_in_the_current_state() {
        let mut clock = FlickerClock::new(&TimingPolicy::default(), 1.0);
        assert_eq!(clock.advance(0.49), 0);
        clock.retune(10.0);
        // 0.49 s would be nine half periods at 10 Hz, but only one toggle is due
        assert_eq!(clock.advance(1.0 / 60.0), 1);
        assert_eq!(clock.advance(1.0 / 60.0), 0);
    }

    #[test]
    fn invalid_refresh_rates_are_rejected() {
        assert!(matches!(
            TimingPolicy::tick_count(0.0),
            Err(FlickerError::InvalidRefreshRate(_))
        ));
        assert!(TimingPolicy::tick_count(f64::NAN).is_err());
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!(TimingKind::from_str("ticks").unwrap(), TimingKind::Ticks);
        assert_eq!(TimingKind::Elapsed.to_string(), "elapsed");
        assert_eq!(Overshoot::from_str("drop").unwrap(), Overshoot::Drop);
    }

    #[test]
    fn negative_dt_is_ignored() {
        let tick = Tick {
            dt_seconds: -0.5,
            index: 0,
            running: true,
        };
        assert_eq!(tick.sanitized_dt(), 0.0);
    }
}
