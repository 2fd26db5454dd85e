use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{select, Receiver};

use recorder_core::{
    ControllerEvent, LineProvider, OutputFormat, RecorderController, RecorderError, RecorderState, Toggle,
};
use recorder_cpal::CpalLineProvider;

use crate::meter;

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);
const METER_WIDTH: usize = 50;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Toggle,
    Devices,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" => Some(Command::Toggle),
        "d" | "devices" => Some(Command::Devices),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Terminal front end: Enter toggles recording, a bar graph shows the
/// live amplitude window, and a stopped recording is saved or discarded.
pub struct App {
    controller: RecorderController<CpalLineProvider>,
    events: Receiver<ControllerEvent>,
    input: Receiver<String>,
}

impl App {
    pub fn new(controller: RecorderController<CpalLineProvider>) -> Result<Self> {
        let events = controller.subscribe();
        let input = spawn_stdin_reader()?;
        Ok(Self {
            controller,
            events,
            input,
        })
    }

    pub fn run(mut self) -> Result<()> {
        println!("Better Recorder on {}", self.controller.session().provider().device_name());
        println!("Enter: start/stop   d: devices   q: quit");

        let input = self.input.clone();
        let events = self.events.clone();
        loop {
            select! {
                recv(input) -> line => {
                    let Ok(line) = line else { break };
                    match parse_command(&line) {
                        Some(Command::Toggle) => self.toggle()?,
                        Some(Command::Devices) => print_devices(),
                        Some(Command::Quit) => break,
                        None => println!("Unknown command {:?}", line.trim()),
                    }
                }
                recv(events) -> event => {
                    if let Ok(event) = event {
                        self.on_event(event);
                    }
                }
                default(REDRAW_INTERVAL) => self.redraw()?,
            }
        }

        self.shutdown();
        Ok(())
    }

    fn toggle(&mut self) -> Result<()> {
        match self.controller.toggle() {
            Ok(Toggle::Started) => println!("Recording, press Enter to stop"),
            Ok(Toggle::Stopped(result)) => {
                println!();
                println!("Stopped after {:.1}s ({} bytes)", result.duration_secs, result.data_bytes);
                self.save_prompt()?;
            }
            // Errors arrive on the event channel.
            Err(_) => {}
        }
        Ok(())
    }

    fn on_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Error(e) => {
                println!();
                println!("Error: {}", e);
                // Reap a failed worker so its partial temp file goes away.
                let reap = !matches!(e, RecorderError::NotRecording | RecorderError::Timeout(_));
                if reap && matches!(self.controller.state(), RecorderState::Failed(_)) {
                    if let Err(e) = self.controller.stop() {
                        log::warn!("Failed to reap failed recording: {}", e);
                    }
                }
            }
            ControllerEvent::Saved(path) => println!("Saved {}", path.display()),
            ControllerEvent::Discarded(path) => log::info!("Discarded {}", path.display()),
            ControllerEvent::StateChanged(state) => log::debug!("State: {}", state.label()),
        }
    }

    fn drain_events(&mut self) {
        let pending: Vec<ControllerEvent> = self.events.try_iter().collect();
        for event in pending {
            self.on_event(event);
        }
    }

    fn redraw(&mut self) -> Result<()> {
        if !self.controller.is_recording() {
            return Ok(());
        }
        let amplitudes = self.controller.poll_amplitudes();
        let seconds = self.controller.state().duration().unwrap_or(0.0);

        let mut out = io::stdout().lock();
        write!(out, "\r[{}] {:6.1}s", meter::render(&amplitudes, METER_WIDTH), seconds)?;
        out.flush()?;
        Ok(())
    }

    /// Ask for a format and a destination. A cancelled prompt discards the
    /// recording.
    fn save_prompt(&mut self) -> Result<()> {
        let format = loop {
            let question = format!("Format [wav/mp3] ({}): ", self.controller.selected_format());
            let Some(answer) = self.prompt(&question)? else {
                self.discard();
                return Ok(());
            };
            if answer.trim().is_empty() {
                break self.controller.selected_format();
            }
            match answer.parse::<OutputFormat>() {
                Ok(format) => break format,
                Err(e) => println!("{}", e),
            }
        };
        self.controller.set_format(format);

        loop {
            let suggested = self.controller.suggested_file_name();
            let answer = self.prompt(&format!("Save as ({}, '-' to discard): ", suggested))?;
            let answer = answer.as_deref().map(str::trim);
            if matches!(answer, None | Some("-")) {
                self.discard();
                return Ok(());
            }
            let answer = answer.unwrap_or_default();
            let dest = if answer.is_empty() {
                PathBuf::from(suggested)
            } else {
                PathBuf::from(answer)
            };

            let saved = self.controller.save(&dest);
            self.drain_events();
            if saved.is_ok() {
                return Ok(());
            }
        }
    }

    fn prompt(&self, question: &str) -> Result<Option<String>> {
        let mut out = io::stdout().lock();
        write!(out, "{}", question)?;
        out.flush()?;
        Ok(self.input.recv().ok())
    }

    fn discard(&mut self) {
        if self.controller.discard().is_ok() {
            println!("Recording discarded");
        }
        self.drain_events();
    }

    fn shutdown(&mut self) {
        if self.controller.is_recording() {
            if let Ok(result) = self.controller.stop() {
                log::info!("Discarding unsaved recording {}", result.id);
                if let Err(e) = self.controller.discard() {
                    log::warn!("Failed to discard recording {}: {}", result.id, e);
                }
            }
        }
        println!();
    }
}

fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;
    Ok(rx)
}

fn print_devices() {
    match recorder_cpal::list_devices() {
        Ok(devices) if devices.is_empty() => println!("No input devices"),
        Ok(devices) => {
            for device in devices {
                let marker = if device.is_default { "*" } else { " " };
                println!("{} {}", marker, device.name);
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}
