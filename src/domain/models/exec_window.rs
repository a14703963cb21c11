//! Execution window: a repeating time-of-day interval gating dispatch.
//!
//! Persisted as a JSON two-element array of `"HH:MM:SS"` strings. A window
//! whose end is less than or equal to its start crosses midnight
//! (`22:00:00 - 05:00:00` opens at 22:00 on the execute day and closes at
//! 05:00 the following day).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TIME_FMT: &str = "%H:%M:%S";

/// Where a wall-clock instant sits relative to a task's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    /// Before the window opens (or the execute date is still in the future).
    Before,
    /// Inside the window.
    Inside,
    /// Past the window close. The close boundary itself counts as After so a
    /// task fires at most once per window.
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for ExecuteWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        }
    }
}

impl ExecuteWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse from `("HH:MM:SS", "HH:MM:SS")` strings.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = NaiveTime::parse_from_str(start, TIME_FMT).ok()?;
        let end = NaiveTime::parse_from_str(end, TIME_FMT).ok()?;
        Some(Self { start, end })
    }

    /// Whether the window wraps past midnight (end <= start).
    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Classify `now` against the window of a task whose execute date is
    /// `execute_date`.
    ///
    /// The window is anchored on the day of `now`. For a cross-midnight
    /// window on the execute day itself the close moves 24h forward; on any
    /// later day the open moves 24h back, so the tail of the previous
    /// night's window still admits the task.
    pub fn position(&self, execute_date: NaiveDate, now: NaiveDateTime) -> WindowPosition {
        if execute_date > now.date() {
            return WindowPosition::Before;
        }

        let mut start = now.date().and_time(self.start);
        let mut end = now.date().and_time(self.end);
        if self.crosses_midnight() {
            if execute_date == now.date() {
                end += Duration::hours(24);
            } else {
                start -= Duration::hours(24);
            }
        }

        if now < start {
            WindowPosition::Before
        } else if now >= end {
            WindowPosition::After
        } else {
            WindowPosition::Inside
        }
    }

    /// Dispatch ordering key: windows compare by their opening time of day.
    pub fn ordering_key(&self) -> NaiveTime {
        self.start
    }

    pub fn start_str(&self) -> String {
        self.start.format(TIME_FMT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(TIME_FMT).to_string()
    }
}

impl std::fmt::Display for ExecuteWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[\"{}\",\"{}\"]", self.start_str(), self.end_str())
    }
}

impl Serialize for ExecuteWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.start_str(), self.end_str()].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExecuteWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts: Vec<String> = Vec::deserialize(deserializer)?;
        if parts.len() != 2 {
            return Err(D::Error::custom(format!(
                "execute window must be a 2-element array, got {}",
                parts.len()
            )));
        }
        ExecuteWindow::parse(&parts[0], &parts[1])
            .ok_or_else(|| D::Error::custom(format!("malformed execute window [{}, {}]", parts[0], parts[1])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    fn window(start: &str, end: &str) -> ExecuteWindow {
        ExecuteWindow::parse(start, end).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let w = window("02:00:00", "05:00:00");
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"["02:00:00","05:00:00"]"#);
        let back: ExecuteWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(serde_json::from_str::<ExecuteWindow>(r#"["02:00:00"]"#).is_err());
        assert!(serde_json::from_str::<ExecuteWindow>(r#"["2am","5am"]"#).is_err());
    }

    #[test]
    fn test_position_same_day() {
        let w = window("02:00:00", "05:00:00");
        let d = date(2024, 1, 15);
        assert_eq!(w.position(d, at(2024, 1, 15, 1, 0)), WindowPosition::Before);
        assert_eq!(w.position(d, at(2024, 1, 15, 3, 0)), WindowPosition::Inside);
        assert_eq!(w.position(d, at(2024, 1, 15, 6, 0)), WindowPosition::After);
    }

    #[test]
    fn test_future_execute_date_is_before() {
        let w = window("02:00:00", "05:00:00");
        assert_eq!(
            w.position(date(2024, 1, 16), at(2024, 1, 15, 3, 0)),
            WindowPosition::Before
        );
    }

    #[test]
    fn test_end_boundary_counts_as_after() {
        let w = window("02:00:00", "05:00:00");
        assert_eq!(
            w.position(date(2024, 1, 15), at(2024, 1, 15, 5, 0)),
            WindowPosition::After
        );
    }

    #[test]
    fn test_cross_midnight_on_execute_day() {
        let w = window("22:00:00", "05:00:00");
        let d = date(2024, 3, 1);
        assert_eq!(w.position(d, at(2024, 3, 1, 21, 0)), WindowPosition::Before);
        assert_eq!(w.position(d, at(2024, 3, 1, 23, 0)), WindowPosition::Inside);
    }

    #[test]
    fn test_cross_midnight_next_day_tail() {
        // Window ["22:00:00","05:00:00"], execute date 2024-03-01, clock
        // 2024-03-02 03:00 is inside the unwrapped window.
        let w = window("22:00:00", "05:00:00");
        let d = date(2024, 3, 1);
        assert_eq!(w.position(d, at(2024, 3, 2, 3, 0)), WindowPosition::Inside);
        assert_eq!(w.position(d, at(2024, 3, 2, 6, 0)), WindowPosition::After);
    }

    #[test]
    fn test_ordering_key() {
        let early = window("01:00:00", "03:00:00");
        let late = window("22:00:00", "05:00:00");
        assert!(early.ordering_key() < late.ordering_key());
    }
}
