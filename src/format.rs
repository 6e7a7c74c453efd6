//! Rendering of elapsed milliseconds for displays and session records.
//!
//! Every conversion truncates toward zero; nothing is rounded up.

use chrono::{DateTime, Local};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Renders `HH:MM:SS`, or `HH:MM:SS.cc` with centiseconds.
///
/// Hours are padded to two digits but never wrapped.
pub fn format_time(ms: u64, with_centis: bool) -> String {
    let total_secs = ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;

    if with_centis {
        let cs = (ms % 1000) / 10;
        format!("{:02}:{:02}:{:02}.{:02}", h, m, s, cs)
    } else {
        format!("{:02}:{:02}:{:02}", h, m, s)
    }
}

/// Renders a human duration such as `"2m 5s"`, `"3m"` or `"0s"`.
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    match (minutes, seconds) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

/// Renders a record timestamp such as `"2025, 3 June - 4:05 pm"`.
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y, %-d %B - %-I:%M %P").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError;

impl Display for TimeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid time, expected HH:MM:SS or HH:MM:SS.cc")
    }
}

impl Error for TimeParseError {}

/// Parses the output of [`format_time`] back into milliseconds.
pub fn parse_time(s: &str) -> Result<u64, TimeParseError> {
    let (clock, centis) = match s.split_once('.') {
        Some((clock, centis)) => (clock, Some(centis)),
        None => (s, None),
    };

    let mut parts = clock.split(':');
    let (Some(h), Some(m), Some(sec), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TimeParseError);
    };

    let h = digits(h, 2..=usize::MAX)?;
    let m = digits(m, 2..=2)?;
    let sec = digits(sec, 2..=2)?;
    if m >= 60 || sec >= 60 {
        return Err(TimeParseError);
    }

    let cs = match centis {
        Some(centis) => digits(centis, 2..=2)?,
        None => 0,
    };

    h.checked_mul(60)
        .and_then(|minutes| minutes.checked_add(m))
        .and_then(|minutes| minutes.checked_mul(60))
        .and_then(|seconds| seconds.checked_add(sec))
        .and_then(|seconds| seconds.checked_mul(1000))
        .and_then(|ms| ms.checked_add(cs * 10))
        .ok_or(TimeParseError)
}

fn digits(s: &str, len: std::ops::RangeInclusive<usize>) -> Result<u64, TimeParseError> {
    if !len.contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError);
    }

    s.parse().map_err(|_| TimeParseError)
}
