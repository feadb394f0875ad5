// Copyright (c) 2024 Marc Pabst
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Terminal driver for the flicker engine.
//!
//! Usage: `flicker [options.json]`
//!
//! Commands (one per line on stdin):
//!   s                         start / stop flickering
//!   <n>                       record a response to box n (1-based)
//!   set <n> <label> <freq>    change label and frequency of box n
//!   show                      print the current settings
//!   q                         quit

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

use flickerbox::prelude::*;
use web_time::Instant;

enum Command {
    Toggle,
    Activate(usize),
    Save(SettingsEdit),
    Show,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "s" | "start" | "stop" => Command::Toggle,
        "q" | "quit" => Command::Quit,
        "show" => Command::Show,
        "set" => {
            let index = parse_box_number(parts.next()?)?;
            let label = parts.next()?;
            let frequency = parts.next()?;
            Command::Save(SettingsEdit::new(index, label, frequency))
        }
        other => Command::Activate(parse_box_number(other)?),
    };
    Some(command)
}

/// Convert a 1-based box number to an index.
fn parse_box_number(input: &str) -> Option<usize> {
    input.parse::<usize>().ok()?.checked_sub(1)
}

/// Read commands from stdin on a separate thread. All state changes happen on
/// the frame loop thread when the commands are drained between ticks.
fn spawn_command_reader() -> Receiver<Command> {
    let (sender, receiver) = channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                None => log::warn!("Unknown command: {:?}", line.trim()),
            }
        }
    });
    receiver
}

/// One status line with the state of every box. While stopped, every box is
/// shown as on.
fn render(engine: &FlickerEngine, columns: usize) -> String {
    let cells: Vec<String> = engine
        .units()
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let on = unit.is_on() || !engine.is_running();
            format!("[{} {:<10} {}]", i + 1, unit.label(), if on { "##" } else { "  " })
        })
        .collect();

    cells
        .chunks(columns.max(1))
        .map(|row| row.join(" "))
        .collect::<Vec<_>>()
        .join(" / ")
}

fn show(engine: &FlickerEngine, settings: &SettingsStore, clock: &FrameClock, refresh_rate: f64) {
    println!();
    for (i, entry) in settings.entries().iter().enumerate() {
        match engine.policy() {
            TimingPolicy::TickCount { refresh_rate } => println!(
                "Box {}: {} at {} Hz (displayed at {:.2} Hz)",
                i + 1,
                entry.label,
                entry.frequency,
                quantized_frequency(*refresh_rate, entry.frequency)
            ),
            TimingPolicy::ElapsedTime { .. } => {
                println!("Box {}: {} at {} Hz", i + 1, entry.label, entry.frequency)
            }
        }
    }
    if let TimingPolicy::TickCount { refresh_rate } = engine.policy() {
        println!("Exact frequencies: {:?}", available_frequencies(*refresh_rate));
    }
    if let (Some(rate), Some(drift)) = (clock.measured_rate(), clock.drift(refresh_rate)) {
        println!("Measured tick rate: {:.2} Hz ({:+.2}%)", rate, drift * 100.0);
    }
}

fn run() -> Result<(), FlickerError> {
    let options = match std::env::args().nth(1) {
        Some(path) => StimulusOptions::from_json_file(path)?,
        None => StimulusOptions::default(),
    };

    let mut engine = FlickerEngine::from_options(&options)?;
    let mut settings = SettingsStore::from_engine(&engine);

    let sink: Box<dyn ResponseSink + Send> = match &options.event_log {
        Some(path) => Box::new(TsvSink::create(path.clone(), options.overwrite_event_log)?),
        None => Box::new(LogSink),
    };
    let mut recorder = ResponseRecorder::for_engine(&engine, sink);

    let commands = spawn_command_reader();
    log::info!("Press 's' + Enter to start, 'q' + Enter to quit");

    let interval = options.frame_interval();
    let report_every = (options.refresh_rate * 5.0).max(1.0) as u64;
    let mut clock = FrameClock::new();
    let mut next_frame = Instant::now() + interval;
    let mut last_line = String::new();

    loop {
        loop {
            let command = match commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            };

            match command {
                Command::Toggle => {
                    engine.toggle();
                }
                Command::Activate(index) => {
                    if let Err(err) = recorder.record(index) {
                        log::warn!("{}", err);
                    }
                }
                Command::Save(edit) => {
                    let report = settings.save(&mut engine, &[edit]);
                    if report.is_clean() {
                        last_line.clear();
                    }
                }
                Command::Show => show(&engine, &settings, &clock, options.refresh_rate),
                Command::Quit => {
                    println!();
                    return Ok(());
                }
            }
        }

        let (dt, index) = clock.next_tick();
        engine.tick(dt, index);

        if index > 0 && index % report_every == 0 {
            if let Some(rate) = clock.measured_rate() {
                log::debug!("Measured tick rate: {:.2} Hz", rate);
            }
        }

        let line = render(&engine, options.columns);
        if line != last_line {
            print!("\r{}", line);
            io::stdout().flush()?;
            last_line = line;
        }

        // wait for the next frame between ticks, never inside them
        let now = Instant::now();
        if next_frame > now {
            spin_sleep::sleep(next_frame - now);
            next_frame += interval;
        } else {
            next_frame = now + interval;
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert!(matches!(parse_command("s"), Some(Command::Toggle)));
        assert!(matches!(parse_command(" 3 "), Some(Command::Activate(2))));
        assert!(matches!(parse_command("0"), None));
        assert!(matches!(parse_command("q"), Some(Command::Quit)));
        match parse_command("set 2 Kiwi 12") {
            Some(Command::Save(edit)) => assert_eq!(edit, SettingsEdit::new(1, "Kiwi", "12")),
            _ => panic!("expected a save command"),
        }
        assert!(parse_command("set 2 Kiwi").is_none());
        assert!(parse_command("").is_none());
    }

    #[test]
    fn stopped_engine_renders_all_boxes_on() {
        let mut engine = FlickerEngine::from_options(&StimulusOptions::default()).unwrap();
        engine.start();
        engine.tick(0.03, 0);
        engine.stop();
        let line = render(&engine, 2);
        assert_eq!(line.matches("##").count(), 4);
        assert_eq!(line.matches(" / ").count(), 1);
    }
}
