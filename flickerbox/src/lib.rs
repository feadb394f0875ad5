// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flickering box stimuli for steady-state visually evoked potential (SSVEP)
//! experiments.
//!
//! A [`FlickerEngine`] holds a fixed set of [`FlickerUnit`]s, each switching
//! between fully visible and fully hidden at its own frequency. The host
//! (whatever draws the boxes) calls [`FlickerEngine::tick`] once per display
//! refresh with the time that passed since the previous call and then paints
//! every box according to [`FlickerUnit::is_on`]. Responses to a box are
//! recorded with a [`ResponseRecorder`], and box labels and frequencies can be
//! changed through a [`SettingsStore`].
//!
//! ```
//! use flickerbox::prelude::*;
//!
//! let mut engine = FlickerEngine::from_options(&StimulusOptions::default())?;
//! let mut recorder = ResponseRecorder::for_engine(&engine, LogSink);
//!
//! engine.start();
//! let mut clock = FrameClock::new();
//! for _ in 0..10 {
//!     let (dt, index) = clock.next_tick();
//!     engine.tick(dt, index);
//!     let _opacities: Vec<f32> = engine.units().iter().map(|u| u.opacity()).collect();
//! }
//! recorder.record(0)?;
//! # Ok::<(), flickerbox::FlickerError>(())
//! ```

pub mod engine;
pub mod errors;
pub mod events;
pub mod frame_clock;
pub mod options;
pub mod recorder;
pub mod settings;
pub mod timing;
pub mod unit;

pub use engine::FlickerEngine;
pub use errors::FlickerError;
pub use options::{BoxOptions, StimulusOptions};
pub use recorder::{ResponseEvent, ResponseRecorder};
pub use settings::{SettingsEdit, SettingsStore};
pub use timing::{Overshoot, TimingPolicy};
pub use unit::FlickerUnit;

pub mod prelude {
    pub use crate::engine::FlickerEngine;
    pub use crate::errors::FlickerError;
    pub use crate::frame_clock::{frame_interval, FrameClock};
    pub use crate::options::{BoxOptions, StimulusOptions};
    pub use crate::recorder::{
        CallbackSink, LogSink, MemorySink, ResponseEvent, ResponseRecorder, ResponseSink,
        StdoutSink, TsvSink,
    };
    pub use crate::settings::{parse_frequency, SaveReport, SettingsEdit, SettingsStore};
    pub use crate::timing::{
        available_frequencies, quantized_frequency, Overshoot, Tick, TimingKind, TimingPolicy,
    };
    pub use crate::unit::FlickerUnit;
}
