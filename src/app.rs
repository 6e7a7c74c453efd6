//! The interactive stopwatch: one event loop fed by user commands, ticking the
//! display between commands while the stopwatch runs.

use crate::clock::Clock;
use crate::format::format_time;
use crate::history::History;
use crate::session::SessionRecord;
use crate::stopwatch::{Observer, State, StopWatch};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::BufRead;
use std::str::FromStr;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Lap,
    Stop,
    /// Renames a current lap by its 1-based position.
    Rename(usize, String),
    Quit,
}

#[derive(Debug)]
pub struct CommandParseError(String);

impl Display for CommandParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown command {:?}", self.0)
    }
}

impl Error for CommandParseError {}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (word, rest) = s.split_once(' ').unwrap_or((s, ""));

        match word {
            "s" | "start" | "resume" => Ok(Command::Start),
            "p" | "pause" => Ok(Command::Pause),
            "l" | "lap" => Ok(Command::Lap),
            "x" | "stop" => Ok(Command::Stop),
            "q" | "quit" => Ok(Command::Quit),
            "n" | "name" => {
                let (position, name) = rest
                    .trim()
                    .split_once(' ')
                    .ok_or_else(|| CommandParseError(s.to_string()))?;
                let position = position
                    .parse::<usize>()
                    .ok()
                    .filter(|position| *position > 0)
                    .ok_or_else(|| CommandParseError(s.to_string()))?;

                Ok(Command::Rename(position, name.trim().to_string()))
            }
            _ => Err(CommandParseError(s.to_string())),
        }
    }
}

pub const HELP: &str = "s: start/resume  p: pause  l: lap  x: stop  n <lap> <name>: rename lap  q: quit";

/// Reads commands from `input` until it closes or the receiver hangs up.
pub fn read_loop(input: impl BufRead, sender: Sender<Command>) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse() {
            Ok(command) => {
                if sender.send(command).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(%e, "Ignoring input");
                println!("{HELP}");
            }
        }
    }

    let _ = sender.send(Command::Quit);

    Ok(())
}

pub struct App<C, O> {
    stopwatch: StopWatch<C>,
    history: History,
    observer: O,
}

impl<C: Clock, O: Observer> App<C, O> {
    pub fn new(stopwatch: StopWatch<C>, history: History, observer: O) -> Self {
        Self {
            stopwatch,
            history,
            observer,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stopwatch(&self) -> &StopWatch<C> {
        &self.stopwatch
    }

    /// Processes commands until `Quit` or the sender hangs up.
    ///
    /// Ticks are only scheduled while the stopwatch runs; otherwise the loop
    /// blocks on the next command.
    pub fn run(&mut self, commands: Receiver<Command>, tick: Duration) -> anyhow::Result<()> {
        loop {
            let command = if self.stopwatch.is_running() {
                match commands.recv_timeout(tick) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => {
                        self.stopwatch.tick(&mut self.observer);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => Command::Quit,
                }
            } else {
                commands.recv().unwrap_or(Command::Quit)
            };

            if !self.handle(command)? {
                return Ok(());
            }
        }
    }

    /// Applies one command. Returns `false` once the app should exit.
    pub fn handle(&mut self, command: Command) -> anyhow::Result<bool> {
        tracing::debug!(?command, state = ?self.stopwatch.state(), "handling command");

        match command {
            Command::Start => {
                self.stopwatch.start();
                self.stopwatch.tick(&mut self.observer);
            }
            Command::Pause => {
                if self.stopwatch.is_running() {
                    self.stopwatch.pause();
                    self.observer.on_idle();
                    println!("Paused at {}", format_time(self.stopwatch.elapsed(), true));
                }
            }
            Command::Lap => {
                if let Some(lap) = self.stopwatch.mark_lap() {
                    println!("\n{} : {}", lap.name, format_time(lap.mark, true));
                }
            }
            Command::Rename(position, name) => {
                let renamed = position
                    .checked_sub(1)
                    .is_some_and(|index| self.stopwatch.rename_lap(index, name));
                if !renamed {
                    println!("There is no lap {position}");
                }
            }
            Command::Stop => self.stop()?,
            Command::Quit => {
                self.stop()?;
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        let was_running = self.stopwatch.state() == State::Running;
        let Some(record) = self.stopwatch.stop() else {
            return Ok(());
        };

        if was_running {
            self.observer.on_idle();
        }

        print_record(&record, true);
        tracing::info!(id = record.id, total = record.total, "session recorded");

        self.history.push(record);
        self.history.save()
    }
}

pub fn print_record(record: &SessionRecord, laps: bool) {
    println!("[{}] {} - {}  ({})", record.id, record.name, record.duration, record.timestamp);

    if laps {
        for lap in &record.laps {
            println!(
                "    [{}] {} : {}  (at {})",
                lap.id,
                lap.name,
                format_time(lap.duration, true),
                format_time(lap.mark, true)
            );
        }
    }
}
