// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use web_time::{Duration, Instant};

/// The nominal time between two frames at `refresh_rate` Hz.
pub fn frame_interval(refresh_rate: f64) -> Duration {
    Duration::from_secs_f64(1.0 / refresh_rate)
}

/// Measures the real time between ticks so the engine can be driven by actual
/// elapsed time rather than the nominal refresh interval.
///
/// The clock never sleeps. Pacing the loop is the job of the host.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    tick_index: u64,
    total: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            tick_index: 0,
            total: Duration::ZERO,
        }
    }

    /// Measure the time since the previous call (or since creation) and return
    /// it together with the index of this tick.
    pub fn next_tick(&mut self) -> (f64, u64) {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.total += dt;

        let index = self.tick_index;
        self.tick_index += 1;
        (dt.as_secs_f64(), index)
    }

    /// Forget all measurements and start counting from now.
    pub fn restart(&mut self) {
        *self = Self::new();
    }

    /// Number of ticks measured so far.
    pub fn ticks(&self) -> u64 {
        self.tick_index
    }

    /// Mean time between ticks, if any tick has been measured.
    pub fn mean_dt(&self) -> Option<f64> {
        if self.tick_index == 0 {
            None
        } else {
            Some(self.total.as_secs_f64() / self.tick_index as f64)
        }
    }

    /// The tick rate actually achieved, in Hz.
    pub fn measured_rate(&self) -> Option<f64> {
        self.mean_dt().filter(|dt| *dt > 0.0).map(|dt| 1.0 / dt)
    }

    /// Relative deviation of the achieved tick rate from `refresh_rate`.
    pub fn drift(&self, refresh_rate: f64) -> Option<f64> {
        self.measured_rate()
            .map(|rate| (rate - refresh_rate) / refresh_rate)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
