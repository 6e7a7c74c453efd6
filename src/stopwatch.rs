use crate::clock::{Clock, SystemClock};
use crate::session::{IdGenerator, Lap, Recorder, SessionRecord};

/// Receives the elapsed time whenever a running stopwatch ticks.
pub trait Observer {
    fn on_tick(&mut self, elapsed: u64);

    /// The stopwatch stopped advancing, either paused or reset.
    fn on_idle(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Paused,
}

/// A pausable stopwatch that marks laps and records a session when stopped.
///
/// Elapsed time is sampled from the clock rather than accumulated, so ticks
/// can come at any cadence without drifting.
#[derive(Debug, Default)]
pub struct StopWatch<C = SystemClock> {
    clock: C,
    reference: Option<i64>,
    elapsed: u64,
    laps: Vec<Lap>,
    lap_ids: IdGenerator,
    recorder: Recorder,
}

impl<C: Clock> StopWatch<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            reference: None,
            elapsed: 0,
            laps: Vec::new(),
            lap_ids: IdGenerator::default(),
            recorder: Recorder::default(),
        }
    }

    pub fn state(&self) -> State {
        if self.reference.is_some() {
            State::Running
        } else if self.elapsed > 0 || !self.laps.is_empty() {
            State::Paused
        } else {
            State::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.reference.is_some()
    }

    /// Starts from idle or resumes from paused.
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("ignoring start while running");
            return;
        }

        // Re-base so the time accumulated before a pause carries over.
        self.reference = Some(self.clock.now() as i64 - self.elapsed as i64);
    }

    pub fn pause(&mut self) {
        match self.reference.take() {
            Some(reference) => self.elapsed = since(reference, self.clock.now()),
            None => tracing::debug!("ignoring pause while not running"),
        }
    }

    /// Elapsed time right now. Does not touch the cached value.
    pub fn elapsed(&self) -> u64 {
        match self.reference {
            Some(reference) => since(reference, self.clock.now()),
            None => self.elapsed,
        }
    }

    /// Refreshes the cached elapsed time and pushes it to the observer.
    ///
    /// Ticks are only meaningful while running; otherwise the observer is not
    /// notified.
    pub fn tick(&mut self, observer: &mut impl Observer) -> u64 {
        if let Some(reference) = self.reference {
            self.elapsed = since(reference, self.clock.now());
            observer.on_tick(self.elapsed);
        }

        self.elapsed
    }

    /// Marks a lap at the current elapsed time. Ignored unless running.
    pub fn mark_lap(&mut self) -> Option<&Lap> {
        let Some(reference) = self.reference else {
            tracing::debug!("ignoring lap while not running");
            return None;
        };

        let now = self.clock.now();
        self.elapsed = since(reference, now);

        let lap = Lap::new(self.lap_ids.next(now), self.laps.len() + 1, self.elapsed);
        tracing::debug!(id = lap.id, mark = lap.mark, "marked lap");
        self.laps.push(lap);

        self.laps.last()
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn rename_lap(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.laps.get_mut(index) {
            Some(lap) => {
                lap.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Finalizes the current session and resets to idle.
    ///
    /// Returns `None` when there is no session to stop.
    pub fn stop(&mut self) -> Option<SessionRecord> {
        if self.state() == State::Idle {
            tracing::debug!("ignoring stop while idle");
            return None;
        }

        let now = self.clock.now();
        if let Some(reference) = self.reference.take() {
            self.elapsed = since(reference, now);
        }

        let laps = std::mem::take(&mut self.laps);
        let record = self.recorder.record(now, self.elapsed, laps);
        self.elapsed = 0;

        Some(record)
    }
}

// Saturates at zero if the clock moved behind the reference.
fn since(reference: i64, now: u64) -> u64 {
    (now as i64 - reference).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[derive(Default)]
    struct Ticks {
        values: Vec<u64>,
        idle: usize,
    }

    impl Observer for Ticks {
        fn on_tick(&mut self, elapsed: u64) {
            self.values.push(elapsed);
        }

        fn on_idle(&mut self) {
            self.idle += 1;
        }
    }

    fn stopwatch() -> (StopWatch<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        (StopWatch::new(clock.clone()), clock)
    }

    #[test]
    fn transitions_between_states() {
        let (mut watch, clock) = stopwatch();
        assert_eq!(watch.state(), State::Idle);

        watch.start();
        assert_eq!(watch.state(), State::Running);

        clock.advance(10);
        watch.pause();
        assert_eq!(watch.state(), State::Paused);

        watch.start();
        assert_eq!(watch.state(), State::Running);

        assert!(watch.stop().is_some());
        assert_eq!(watch.state(), State::Idle);
        assert_eq!(watch.elapsed(), 0);
    }

    #[test]
    fn elapsed_follows_clock_while_running() {
        let (mut watch, clock) = stopwatch();
        watch.start();

        clock.advance(500);
        assert_eq!(watch.elapsed(), 500);
        clock.advance(500);
        assert_eq!(watch.elapsed(), 1000);
    }

    #[test]
    fn elapsed_frozen_while_paused() {
        let (mut watch, clock) = stopwatch();
        watch.start();
        clock.advance(1000);
        watch.pause();

        clock.advance(60_000);
        assert_eq!(watch.elapsed(), 1000);
    }

    #[test]
    fn pause_then_start_conserves_elapsed() {
        let (mut watch, clock) = stopwatch();
        watch.start();
        clock.advance(2345);
        watch.pause();
        watch.start();

        assert_eq!(watch.elapsed(), 2345);
    }

    #[test]
    fn repeated_transitions_are_no_ops() {
        let (mut watch, clock) = stopwatch();
        watch.pause();
        assert_eq!(watch.state(), State::Idle);

        watch.start();
        clock.advance(300);
        watch.start();
        assert_eq!(watch.elapsed(), 300);

        watch.pause();
        clock.advance(300);
        watch.pause();
        assert_eq!(watch.elapsed(), 300);
    }

    #[test]
    fn tick_pushes_only_while_running() {
        let (mut watch, clock) = stopwatch();
        let mut ticks = Ticks::default();

        watch.tick(&mut ticks);
        watch.start();
        clock.advance(16);
        watch.tick(&mut ticks);
        clock.advance(16);
        watch.tick(&mut ticks);
        watch.pause();
        clock.advance(16);
        assert_eq!(watch.tick(&mut ticks), 32);

        assert_eq!(ticks.values, vec![16, 32]);
        assert_eq!(ticks.idle, 0);
    }

    #[test]
    fn laps_only_marked_while_running() {
        let (mut watch, clock) = stopwatch();
        assert!(watch.mark_lap().is_none());

        watch.start();
        clock.advance(1500);
        let lap = watch.mark_lap().cloned().unwrap();
        assert_eq!(lap.name, "Lap 1");
        assert_eq!(lap.mark, 1500);

        watch.pause();
        assert!(watch.mark_lap().is_none());
        assert_eq!(watch.laps().len(), 1);
    }

    #[test]
    fn lap_ids_are_unique_within_a_millisecond() {
        let (mut watch, _clock) = stopwatch();
        watch.start();
        watch.mark_lap();
        watch.mark_lap();

        let laps = watch.laps();
        assert_ne!(laps[0].id, laps[1].id);
        assert_eq!(laps[1].name, "Lap 2");
    }

    #[test]
    fn renamed_laps_keep_their_name() {
        let (mut watch, clock) = stopwatch();
        watch.start();
        clock.advance(100);
        watch.mark_lap();

        assert!(watch.rename_lap(0, "Warm up"));
        assert!(!watch.rename_lap(5, "Nope"));

        clock.advance(100);
        watch.mark_lap();
        let record = watch.stop().unwrap();
        assert_eq!(record.laps[0].name, "Warm up");
        assert_eq!(record.laps[1].name, "Lap 2");
    }

    #[test]
    fn stop_hands_over_laps_and_resets() {
        let (mut watch, clock) = stopwatch();
        watch.start();
        clock.advance(1500);
        watch.mark_lap();
        clock.advance(2700);
        watch.mark_lap();
        clock.advance(800);

        let record = watch.stop().unwrap();
        assert_eq!(record.total, 5000);
        assert_eq!(record.laps.len(), 2);
        assert!(watch.laps().is_empty());
        assert_eq!(watch.state(), State::Idle);
    }

    #[test]
    fn stop_while_idle_records_nothing() {
        let (mut watch, _clock) = stopwatch();
        assert!(watch.stop().is_none());
    }

    #[test]
    fn stop_from_pause_uses_frozen_elapsed() {
        let (mut watch, clock) = stopwatch();
        watch.start();
        clock.advance(10_000);
        watch.pause();
        clock.advance(99_000);

        assert_eq!(watch.stop().unwrap().total, 10_000);
    }

    #[test]
    fn backward_clock_saturates_at_zero() {
        let (mut watch, clock) = stopwatch();
        watch.start();
        clock.set(0);

        assert_eq!(watch.elapsed(), 0);
    }
}
