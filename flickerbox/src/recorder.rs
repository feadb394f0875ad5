// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use web_time::Instant;

use crate::engine::FlickerEngine;
use crate::errors::{check_index, Result};
use crate::events::EventFile;

/// Format of the wall-clock timestamp attached to every response.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A participant attending to (touching, clicking) one of the boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEvent {
    /// Zero-based index of the unit.
    pub unit_index: usize,
    /// Local wall-clock time of the response.
    pub timestamp: DateTime<Local>,
    /// Seconds since the recorder was created.
    pub onset: f64,
}

impl ResponseEvent {
    /// The timestamp formatted as `YYYY-MM-DD HH:MM:SS`.
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for ResponseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User attended to Box {} at {}",
            self.unit_index + 1,
            self.formatted_timestamp()
        )
    }
}

/// Destination for response events.
pub trait ResponseSink {
    fn emit(&mut self, event: &ResponseEvent) -> Result<()>;
}

/// Logs every response at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResponseSink for LogSink {
    fn emit(&mut self, event: &ResponseEvent) -> Result<()> {
        log::info!("{}", event);
        Ok(())
    }
}

/// Prints every response to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ResponseSink for StdoutSink {
    fn emit(&mut self, event: &ResponseEvent) -> Result<()> {
        println!("{}", event);
        Ok(())
    }
}

/// Keeps every response in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Vec<ResponseEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ResponseEvent] {
        &self.events
    }

    /// Remove and return all stored events.
    pub fn drain(&mut self) -> Vec<ResponseEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ResponseSink for MemorySink {
    fn emit(&mut self, event: &ResponseEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Hands every response to a closure.
pub struct CallbackSink<F>(pub F);

impl<F> ResponseSink for CallbackSink<F>
where
    F: FnMut(&ResponseEvent),
{
    fn emit(&mut self, event: &ResponseEvent) -> Result<()> {
        (self.0)(event);
        Ok(())
    }
}

/// Writes every response as a row of an `*events.tsv` file, with the 1-based
/// box number and the formatted timestamp as extra columns.
pub struct TsvSink {
    file: EventFile,
}

impl TsvSink {
    pub fn create(path: impl Into<PathBuf>, overwrite: bool) -> Result<Self> {
        let file = EventFile::create(path, ["box", "timestamp"], overwrite)?;
        log::debug!("Writing responses to {}", file.path().display());
        Ok(Self { file })
    }
}

impl ResponseSink for TsvSink {
    fn emit(&mut self, event: &ResponseEvent) -> Result<()> {
        let values = [
            (event.unit_index + 1).to_string(),
            event.formatted_timestamp(),
        ];
        self.file.write(event.onset, 0.0, &values)
    }
}

impl ResponseSink for Box<dyn ResponseSink + Send> {
    fn emit(&mut self, event: &ResponseEvent) -> Result<()> {
        (**self).emit(event)
    }
}

/// Turns activations of a unit into timestamped response events.
///
/// Every activation is recorded, no matter how often the same unit is
/// activated.
pub struct ResponseRecorder<S: ResponseSink> {
    unit_count: usize,
    sink: S,
    start_time: Instant,
    recorded: u64,
}

impl<S: ResponseSink> ResponseRecorder<S> {
    /// Create a recorder for `unit_count` units.
    pub fn new(unit_count: usize, sink: S) -> Self {
        Self {
            unit_count,
            sink,
            start_time: Instant::now(),
            recorded: 0,
        }
    }

    /// Create a recorder for the units of `engine`.
    pub fn for_engine(engine: &FlickerEngine, sink: S) -> Self {
        Self::new(engine.len(), sink)
    }

    /// Record an activation of the unit at `index`. Nothing is emitted if the
    /// index is out of range or the sink fails.
    pub fn record(&mut self, index: usize) -> Result<ResponseEvent> {
        let unit_index = check_index(index, self.unit_count)?;

        let event = ResponseEvent {
            unit_index,
            timestamp: Local::now(),
            onset: self.start_time.elapsed().as_secs_f64(),
        };

        self.sink.emit(&event)?;
        self.recorded += 1;
        Ok(event)
    }

    /// Number of responses emitted so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
