// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::engine::FlickerEngine;
use crate::errors::{check_index, FlickerError, Result};

/// Label and frequency of one unit as shown in the settings dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSettings {
    pub label: String,
    pub frequency: f64,
}

/// One row of the settings dialog: the new label and the frequency exactly as
/// the user typed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsEdit {
    pub index: usize,
    pub label: String,
    pub frequency: String,
}

impl SettingsEdit {
    pub fn new(index: usize, label: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            frequency: frequency.into(),
        }
    }
}

/// Outcome of saving a batch of edits.
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Indices of the units that were updated, in edit order.
    pub applied: Vec<usize>,
    /// Edits that were rejected. The units they address were left untouched.
    pub rejected: Vec<(usize, FlickerError)>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parse a frequency typed into the settings dialog. Positive numbers written
/// as plain digits with an optional decimal point are accepted (`12`, `7.5`);
/// surrounding whitespace is ignored.
pub fn parse_frequency(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    let plain = !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.');

    match trimmed.parse::<f64>() {
        Ok(value) if plain && value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(FlickerError::InvalidFrequency(format!("\"{}\"", input))),
    }
}

/// The current label and frequency of every unit, indexed like the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsStore {
    entries: Vec<UnitSettings>,
}

impl SettingsStore {
    /// Take a snapshot of the settings of every unit of `engine`.
    pub fn from_engine(engine: &FlickerEngine) -> Self {
        let entries = engine
            .units()
            .iter()
            .map(|unit| UnitSettings {
                label: unit.label().to_string(),
                frequency: unit.frequency(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[UnitSettings] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Result<&UnitSettings> {
        let index = check_index(index, self.entries.len())?;
        Ok(&self.entries[index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A batch pre-filled with the current values, one edit per unit.
    pub fn edits_from_entries(&self) -> Vec<SettingsEdit> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                SettingsEdit::new(index, entry.label.clone(), entry.frequency.to_string())
            })
            .collect()
    }

    /// Apply a batch of edits to the store and to `engine`.
    ///
    /// Every edit is validated on its own. A rejected edit leaves its unit as
    /// it was and does not prevent the other edits from being applied.
    pub fn save(&mut self, engine: &mut FlickerEngine, edits: &[SettingsEdit]) -> SaveReport {
        let mut report = SaveReport::default();

        for edit in edits {
            match self.apply(engine, edit) {
                Ok(()) => report.applied.push(edit.index),
                Err(err) => {
                    log::warn!("Rejected settings for box {}: {}", edit.index + 1, err);
                    report.rejected.push((edit.index, err));
                }
            }
        }

        log::debug!(
            "Saved settings: {} applied, {} rejected",
            report.applied.len(),
            report.rejected.len()
        );
        report
    }

    fn apply(&mut self, engine: &mut FlickerEngine, edit: &SettingsEdit) -> Result<()> {
        let index = check_index(edit.index, self.entries.len())?;
        let frequency = parse_frequency(&edit.frequency)?;

        engine.set_unit(index, frequency, edit.label.clone())?;
        self.entries[index] = UnitSettings {
            label: edit.label.clone(),
            frequency,
        };
        Ok(())
    }
}
