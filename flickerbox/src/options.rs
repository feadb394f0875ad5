// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{FlickerError, Result};
use crate::timing::{Overshoot, TimingKind, TimingPolicy};

/// Startup options for a flicker session. Missing fields in a configuration
/// file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusOptions {
    /// The nominal refresh rate of the display in Hz. The host is expected to
    /// tick the engine at this rate.
    pub refresh_rate: f64,

    /// Which timing policy the units use.
    pub timing: TimingKind,

    /// What the elapsed-time policy does with time beyond a half period.
    /// Ignored by the tick-count policy.
    pub overshoot: Overshoot,

    /// Number of columns of the box grid.
    pub columns: usize,

    /// The boxes, in index order.
    pub boxes: Vec<BoxOptions>,

    /// Optional `*events.tsv` file to which responses are written.
    pub event_log: Option<PathBuf>,

    /// Whether an existing, non-empty event file may be replaced.
    pub overwrite_event_log: bool,
}

/// Initial settings of a single box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxOptions {
    pub label: String,
    /// Flicker frequency in Hz.
    pub frequency: f64,
    /// RGBA colour of the box while it is on.
    #[serde(default = "BoxOptions::default_color")]
    pub color: [f32; 4],
}

impl BoxOptions {
    pub fn new(label: impl Into<String>, frequency: f64) -> Self {
        Self {
            label: label.into(),
            frequency,
            color: Self::default_color(),
        }
    }

    fn default_color() -> [f32; 4] {
        [0.8, 0.8, 0.8, 1.0]
    }
}

impl Default for StimulusOptions {
    fn default() -> Self {
        Self {
            refresh_rate: 60.0,
            timing: TimingKind::Elapsed,
            overshoot: Overshoot::Carry,
            columns: 2,
            boxes: vec![
                BoxOptions::new("Banana", 20.0),
                BoxOptions::new("Apple", 30.0),
                BoxOptions::new("Orange", 60.0),
                BoxOptions::new("Cucumber", 15.0),
            ],
            event_log: None,
            overwrite_event_log: false,
        }
    }
}

impl StimulusOptions {
    /// Read options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let options = Self::from_json_str(&contents)?;
        log::debug!("Loaded options from {}", path.as_ref().display());
        Ok(options)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        // fail early instead of when the engine is built
        options.policy()?;
        Ok(options)
    }

    /// Build the timing policy described by these options.
    pub fn policy(&self) -> Result<TimingPolicy> {
        if !(self.refresh_rate.is_finite() && self.refresh_rate > 0.0) {
            return Err(FlickerError::InvalidRefreshRate(self.refresh_rate));
        }

        match self.timing {
            TimingKind::Elapsed => Ok(TimingPolicy::ElapsedTime {
                overshoot: self.overshoot,
            }),
            TimingKind::Ticks => TimingPolicy::tick_count(self.refresh_rate),
        }
    }

    /// Interval between two ticks at the nominal refresh rate.
    pub fn frame_interval(&self) -> std::time::Duration {
        crate::frame_clock::frame_interval(self.refresh_rate)
    }
}
