// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tab-separated event files in the layout used by BIDS `*_events.tsv` files.

use std::path::{Path, PathBuf};

use crate::errors::{FlickerError, Result};

/// An `*events.tsv` file. The first two columns are always `onset` and
/// `duration` (both in seconds), followed by the columns given on creation.
/// Every row is flushed to disk as soon as it is written.
pub struct EventFile {
    filepath: PathBuf,
    columns: Vec<String>,
    writer: csv::Writer<std::fs::File>,
}

impl EventFile {
    /// Create a new event file and write its header.
    ///
    /// Fails if the path does not end in `events.tsv`, or if the file exists,
    /// is not empty and `overwrite` is false.
    pub fn create<P, I, S>(path: P, columns: I, overwrite: bool) -> Result<Self>
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filepath = path.into();
        check_bids_path(&filepath)?;

        // check if file exists and is not empty
        if filepath.exists() && std::fs::metadata(&filepath)?.len() > 0 {
            if overwrite {
                log::warn!("Overwriting existing event file {}", filepath.display());
                std::fs::remove_file(&filepath)?;
            } else {
                return Err(FlickerError::FileExistsAndNotEmptyError(
                    filepath.to_string_lossy().to_string(),
                ));
            }
        }

        // add mandatory columns "onset" and "duration"
        let columns: Vec<String> = ["onset".to_string(), "duration".to_string()]
            .into_iter()
            .chain(columns.into_iter().map(Into::into))
            .collect();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .from_path(&filepath)?;

        writer.write_record(&columns)?;
        writer.flush()?;

        Ok(Self {
            filepath,
            columns,
            writer,
        })
    }

    /// Write one event. `values` must hold one entry per extra column.
    pub fn write<S: AsRef<str>>(&mut self, onset: f64, duration: f64, values: &[S]) -> Result<()> {
        let expected = self.columns.len() - 2;
        if values.len() != expected {
            return Err(FlickerError::DataLengthMismatchError(values.len(), expected));
        }

        let onset = format!("{:.6}", onset);
        let duration = format!("{:.6}", duration);
        let record = [onset.as_str(), duration.as_str()]
            .into_iter()
            .chain(values.iter().map(|v| v.as_ref()));

        self.writer.write_record(record)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn path(&self) -> &Path {
        &self.filepath
    }
}

fn check_bids_path(path: &Path) -> Result<()> {
    let path_str = path.to_str().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path contains invalid characters",
        )
    })?;

    if !path_str.ends_with("events.tsv") {
        return Err(FlickerError::InvalidBIDSPathError(
            path_str.to_string(),
            "path must end with \"*events.tsv\"".to_string(),
        ));
    }
    Ok(())
}
