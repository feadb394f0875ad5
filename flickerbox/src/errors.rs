// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlickerError {
    // stimulus errors
    #[error("Invalid frequency: {0}. Frequencies must be positive numbers.")]
    InvalidFrequency(String),
    #[error("The index {index} is out of bounds for {len} flicker units.")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Invalid refresh rate: {0}. The refresh rate must be a positive number.")]
    InvalidRefreshRate(f64),

    // file errors
    #[error("{0}")]
    IOError(#[from] std::io::Error),
    #[error("File already exists and is not empty: {0}")]
    FileExistsAndNotEmptyError(String),

    // event logging errors
    #[error("The length of the data ({0}) does not match the length of the column names ({1}).")]
    DataLengthMismatchError(usize, usize),
    #[error("{0}")]
    CSVError(#[from] csv::Error),

    // BIDS errors
    #[error(
        "The provided file name or path is not allowed under the BIDS specification: {0}. \
         Reason: {1}"
    )]
    InvalidBIDSPathError(String, String),

    // configuration errors
    #[error("Could not parse configuration: {0}")]
    ConfigError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlickerError>;

/// Checks that a frequency can be used to derive a half period.
pub(crate) fn check_frequency(frequency: f64) -> Result<f64> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(frequency)
    } else {
        Err(FlickerError::InvalidFrequency(frequency.to_string()))
    }
}

/// Checks that `index` addresses one of `len` units.
pub(crate) fn check_index(index: usize, len: usize) -> Result<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(FlickerError::IndexOutOfRange { index, len })
    }
}
