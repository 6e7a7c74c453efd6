use crate::format::format_time;
use crate::stopwatch::Observer;
use std::io::Write;

pub const IDLE_TITLE: &str = "Tarot Insight";

/// Redraws the elapsed time in place on the current line.
pub struct Readout<W> {
    out: W,
}

impl<W: Write> Readout<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Observer for Readout<W> {
    fn on_tick(&mut self, elapsed: u64) {
        let result = write!(self.out, "\r{}", format_time(elapsed, true)).and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(%e, "Failed to draw the clock");
        }
    }

    fn on_idle(&mut self) {
        if let Err(e) = writeln!(self.out) {
            tracing::warn!(%e, "Failed to draw the clock");
        }
    }
}

/// Shows a whole-second summary in the terminal title while running.
pub struct Title<W> {
    out: W,
    shown: Option<u64>,
}

impl<W: Write> Title<W> {
    pub fn new(out: W) -> Self {
        Self { out, shown: None }
    }

    fn set(&mut self, title: &str) {
        let result = write!(self.out, "\x1b]0;{title}\x07").and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(%e, "Failed to set the terminal title");
        }
    }
}

impl<W: Write> Observer for Title<W> {
    fn on_tick(&mut self, elapsed: u64) {
        let second = elapsed / 1000;
        if self.shown != Some(second) {
            self.shown = Some(second);
            self.set(&format_time(elapsed, false));
        }
    }

    fn on_idle(&mut self) {
        self.shown = None;
        self.set(IDLE_TITLE);
    }
}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn on_tick(&mut self, elapsed: u64) {
        self.0.on_tick(elapsed);
        self.1.on_tick(elapsed);
    }

    fn on_idle(&mut self) {
        self.0.on_idle();
        self.1.on_idle();
    }
}
