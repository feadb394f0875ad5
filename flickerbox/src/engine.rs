// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::errors::{check_frequency, check_index, Result};
use crate::options::StimulusOptions;
use crate::timing::{Tick, TimingPolicy};
use crate::unit::FlickerUnit;

/// Drives a fixed set of flicker units. The host calls [`FlickerEngine::tick`]
/// once per display refresh and then reads [`FlickerUnit::is_on`] for every
/// unit to decide what to paint.
///
/// The number and order of units never change after construction; the index of
/// a unit is its identity for settings edits and response logging.
#[derive(Debug, Clone)]
pub struct FlickerEngine {
    units: Vec<FlickerUnit>,
    policy: TimingPolicy,
    running: bool,
    ticks_while_running: u64,
}

impl FlickerEngine {
    /// Create a stopped engine from already constructed units.
    pub fn new(policy: TimingPolicy, units: Vec<FlickerUnit>) -> Self {
        Self {
            units,
            policy,
            running: false,
            ticks_while_running: 0,
        }
    }

    /// Create a stopped engine with one unit per configured box.
    pub fn from_options(options: &StimulusOptions) -> Result<Self> {
        let policy = options.policy()?;
        let units = options
            .boxes
            .iter()
            .map(|b| FlickerUnit::new(b.label.clone(), b.frequency, &policy))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Created flicker engine with {} units using the {} timing policy",
            units.len(),
            policy.kind()
        );

        Ok(Self::new(policy, units))
    }

    /// Advance every unit by one tick. Does nothing while the engine is stopped.
    pub fn tick(&mut self, dt_seconds: f64, tick_index: u64) {
        if !self.running {
            return;
        }

        let tick = Tick {
            dt_seconds,
            index: tick_index,
            running: self.running,
        };
        for unit in self.units.iter_mut() {
            unit.advance(&tick);
        }
        self.ticks_while_running += 1;
    }

    pub fn start(&mut self) {
        if !self.running {
            log::debug!("Flickering started");
        }
        self.running = true;
    }

    /// Stop flickering. Units keep their current state.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!(
                "Flickering stopped after {} ticks",
                self.ticks_while_running
            );
        }
        self.running = false;
    }

    /// Start if stopped, stop if running. Returns the new running state.
    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
        self.running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Change frequency and label of the unit at `index`.
    pub fn set_unit(
        &mut self,
        index: usize,
        frequency: f64,
        label: impl Into<String>,
    ) -> Result<()> {
        let index = check_index(index, self.units.len())?;
        let frequency = check_frequency(frequency)?;
        self.units[index].configure(frequency, label)
    }

    /// Put every unit back into the "on" state with a fresh clock.
    pub fn reset_phases(&mut self) {
        for unit in self.units.iter_mut() {
            unit.reset_phase();
        }
    }

    pub fn unit(&self, index: usize) -> Result<&FlickerUnit> {
        let index = check_index(index, self.units.len())?;
        Ok(&self.units[index])
    }

    pub fn units(&self) -> &[FlickerUnit] {
        &self.units
    }

    /// The visible state of every unit, in index order.
    pub fn states(&self) -> Vec<bool> {
        self.units.iter().map(FlickerUnit::is_on).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn policy(&self) -> &TimingPolicy {
        &self.policy
    }

    /// Number of ticks that advanced the units.
    pub fn ticks_while_running(&self) -> u64 {
        self.ticks_while_running
    }
}
