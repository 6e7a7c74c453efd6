use crate::format;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_NAME: &str = "Untitled";

/// A lap mark and, once its session is finalized, its duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    pub id: u64,
    pub name: String,
    /// Elapsed session time when the lap was marked.
    #[serde(rename = "time")]
    pub mark: u64,
    #[serde(rename = "durationMs", default)]
    pub duration: u64,
    /// Human-readable duration, e.g. `"1m 5s"`.
    #[serde(rename = "duration", default)]
    pub formatted: String,
}

impl Lap {
    pub fn new(id: u64, ordinal: usize, mark: u64) -> Self {
        Self {
            id,
            name: format!("Lap {ordinal}"),
            mark,
            duration: 0,
            formatted: String::new(),
        }
    }
}

/// One finished start-to-stop cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: u64,
    pub name: String,
    /// Human-readable total, e.g. `"2m 5s"`.
    #[serde(rename = "time")]
    pub duration: String,
    #[serde(rename = "totalMs", default)]
    pub total: u64,
    pub timestamp: String,
    #[serde(default)]
    pub laps: Vec<Lap>,
    #[serde(rename = "isExpanded", default)]
    pub expanded: bool,
}

/// Hands out ids derived from the creation time, bumped past the last id
/// whenever two are requested within the same millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn next(&mut self, now: u64) -> u64 {
        let id = now.max(self.last + 1);
        self.last = id;
        id
    }
}

/// Turns the lap marks and final elapsed time of a stopped stopwatch into a
/// [`SessionRecord`].
#[derive(Debug, Default)]
pub struct Recorder {
    ids: IdGenerator,
}

impl Recorder {
    pub fn record(&mut self, now: u64, elapsed: u64, laps: Vec<Lap>) -> SessionRecord {
        let laps = self.finalize(now, elapsed, laps);
        let created = Local
            .timestamp_millis_opt(now as i64)
            .single()
            .unwrap_or_else(Local::now);

        let record = SessionRecord {
            id: self.ids.next(now),
            name: DEFAULT_SESSION_NAME.to_string(),
            duration: format::format_duration(elapsed),
            total: elapsed,
            timestamp: format::timestamp(created),
            laps,
            expanded: false,
        };

        tracing::debug!(id = record.id, total = record.total, laps = record.laps.len(), "recorded session");

        record
    }

    fn finalize(&mut self, now: u64, elapsed: u64, mut laps: Vec<Lap>) -> Vec<Lap> {
        let mut previous = 0;
        for lap in laps.iter_mut() {
            lap.duration = lap.mark.saturating_sub(previous);
            previous = lap.mark;
        }

        match laps.len() {
            0 if elapsed > 0 => {
                let mut lap = Lap::new(self.ids.next(now), 1, elapsed);
                lap.duration = elapsed;
                laps.push(lap);
            }
            0 => {}
            n => {
                // The tail between the last mark and the stop belongs to the last lap.
                let start = if n > 1 { laps[n - 2].mark } else { 0 };
                laps[n - 1].duration = elapsed.saturating_sub(start);
            }
        }

        for lap in laps.iter_mut() {
            lap.formatted = format::format_duration(lap.duration);
        }

        laps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(marks: &[u64]) -> Vec<Lap> {
        marks
            .iter()
            .enumerate()
            .map(|(i, mark)| Lap::new(i as u64 + 1, i + 1, *mark))
            .collect()
    }

    fn durations(record: &SessionRecord) -> Vec<u64> {
        record.laps.iter().map(|lap| lap.duration).collect()
    }

    #[test]
    fn ids_never_repeat_within_a_millisecond() {
        let mut ids = IdGenerator::default();

        assert_eq!(ids.next(1000), 1000);
        assert_eq!(ids.next(1000), 1001);
        assert_eq!(ids.next(1000), 1002);
        assert_eq!(ids.next(5000), 5000);
        assert_eq!(ids.next(10), 5001);
    }

    #[test]
    fn default_lap_name_uses_ordinal() {
        assert_eq!(Lap::new(7, 3, 0).name, "Lap 3");
    }

    #[test]
    fn tail_extends_last_lap() {
        let mut recorder = Recorder::default();
        let record = recorder.record(10_000, 5000, marks(&[1500, 4200]));

        assert_eq!(durations(&record), vec![1500, 3500]);
        assert_eq!(record.laps[0].formatted, "1s");
        assert_eq!(record.laps[1].formatted, "3s");
        assert_eq!(record.laps[1].mark, 4200);
        assert_eq!(record.total, 5000);
        assert_eq!(record.duration, "5s");
        assert_eq!(record.name, "Untitled");
        assert!(!record.expanded);
    }

    #[test]
    fn single_lap_spans_whole_session() {
        let mut recorder = Recorder::default();
        let record = recorder.record(0, 9000, marks(&[2000]));

        assert_eq!(durations(&record), vec![9000]);
    }

    #[test]
    fn middle_laps_are_intervals_between_marks() {
        let mut recorder = Recorder::default();
        let record = recorder.record(0, 10_000, marks(&[1000, 3000, 6000, 8000]));

        assert_eq!(durations(&record), vec![1000, 2000, 3000, 4000]);
        assert_eq!(durations(&record).iter().sum::<u64>(), record.total);
    }

    #[test]
    fn implicit_lap_when_none_marked() {
        let mut recorder = Recorder::default();
        let record = recorder.record(0, 4321, Vec::new());

        assert_eq!(record.laps.len(), 1);
        assert_eq!(record.laps[0].name, "Lap 1");
        assert_eq!(record.laps[0].mark, 4321);
        assert_eq!(record.laps[0].duration, 4321);
        assert_eq!(record.laps[0].formatted, "4s");
    }

    #[test]
    fn degenerate_session_has_no_laps() {
        let mut recorder = Recorder::default();
        let record = recorder.record(0, 0, Vec::new());

        assert!(record.laps.is_empty());
        assert_eq!(record.total, 0);
        assert_eq!(record.duration, "0s");
    }

    #[test]
    fn session_and_implicit_lap_ids_differ() {
        let mut recorder = Recorder::default();
        let record = recorder.record(42, 100, Vec::new());

        assert_ne!(record.id, record.laps[0].id);
    }

    #[test]
    fn record_serializes_with_history_field_names() {
        let mut recorder = Recorder::default();
        let record = recorder.record(0, 65_000, marks(&[1000]));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["time"], "1m 5s");
        assert_eq!(value["totalMs"], 65_000);
        assert_eq!(value["isExpanded"], false);
        assert_eq!(value["laps"][0]["time"], 1000);
        assert_eq!(value["laps"][0]["durationMs"], 65_000);
        assert_eq!(value["laps"][0]["duration"], "1m 5s");
    }

    #[test]
    fn loads_records_without_millisecond_fields() {
        let json = r#"{
            "id": 1717430700000,
            "name": "Morning",
            "time": "1m 5s",
            "timestamp": "2024, 3 June - 4:05 pm",
            "laps": [{"id": 1, "name": "Lap 1", "time": 65000, "duration": "1m 5s"}]
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.total, 0);
        assert_eq!(record.laps[0].mark, 65_000);
        assert_eq!(record.laps[0].duration, 0);
        assert_eq!(record.laps[0].formatted, "1m 5s");
        assert!(!record.expanded);
    }
}
