//! Calendar arithmetic for policy scheduling.
//!
//! Periods advance whole calendar days or months; execute dates carry no
//! time-of-day component (the window supplies that). All arithmetic is UTC.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::exec_window::{ExecuteWindow, WindowPosition};

/// How often a policy materializes a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    Once,
    Day,
    TwoDay,
    Weekly,
    TwoWeek,
    Monthly,
    Quarterly,
    SixMonths,
    Yearly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Day => "day",
            Self::TwoDay => "two-day",
            Self::Weekly => "weekly",
            Self::TwoWeek => "two-week",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SixMonths => "six-months",
            Self::Yearly => "yearly",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "once" => Some(Self::Once),
            "day" => Some(Self::Day),
            "two-day" => Some(Self::TwoDay),
            "weekly" => Some(Self::Weekly),
            "two-week" => Some(Self::TwoWeek),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "six-months" => Some(Self::SixMonths),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Human label used when composing task names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Once => "one-off",
            Self::Day => "daily",
            Self::TwoDay => "two-day",
            Self::Weekly => "weekly",
            Self::TwoWeek => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SixMonths => "half-yearly",
            Self::Yearly => "yearly",
        }
    }

    /// Whether this period is month-granular, i.e. the policy `day` field
    /// selects the day of month.
    pub fn is_monthly_or_longer(&self) -> bool {
        matches!(self, Self::Monthly | Self::Quarterly | Self::SixMonths | Self::Yearly)
    }
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid month")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).expect("valid month")
    };
    next.signed_duration_since(first).num_days() as u32
}

/// One period after `last`.
///
/// Month-granular periods use calendar-month arithmetic (the day clamps to
/// the target month length; `format_execute_date` substitutes the policy day
/// afterwards anyway). `once` advances a single day so a re-enabled one-off
/// policy lands on the next day rather than on its old date.
pub fn next_schedule_time(period: Period, last: NaiveDate) -> NaiveDate {
    match period {
        Period::Day | Period::Once => last + Duration::days(1),
        Period::TwoDay => last + Duration::days(2),
        Period::Weekly => last + Duration::days(7),
        Period::TwoWeek => last + Duration::days(14),
        Period::Monthly => last.checked_add_months(Months::new(1)).unwrap_or(last),
        Period::Quarterly => last.checked_add_months(Months::new(3)).unwrap_or(last),
        Period::SixMonths => last.checked_add_months(Months::new(6)).unwrap_or(last),
        Period::Yearly => last.checked_add_months(Months::new(12)).unwrap_or(last),
    }
}

/// Final execute date for a task landing in the month of `t`.
///
/// For month-granular periods the policy `day` replaces the day-of-month,
/// clamped to the month length (day=31 in April gives April 30). Shorter
/// periods use `t` as-is.
pub fn format_execute_date(period: Period, day: u32, t: NaiveDate) -> NaiveDate {
    if !period.is_monthly_or_longer() {
        return t;
    }
    let max_day = days_in_month(t.year(), t.month());
    let day = day.clamp(1, max_day);
    NaiveDate::from_ymd_opt(t.year(), t.month(), day).expect("clamped day is valid")
}

/// Whether a policy that has never run has already missed its slot today.
///
/// Month-granular periods miss when the day of month has passed, or when the
/// day matches but the window has closed. Shorter periods only look at the
/// window.
pub fn missed_exec_date_and_window(
    period: Period,
    day: u32,
    window: &ExecuteWindow,
    now: NaiveDateTime,
) -> bool {
    if period.is_monthly_or_longer() {
        if now.day() > day {
            return true;
        }
        if now.day() == day {
            return window.position(now.date(), now) == WindowPosition::After;
        }
        false
    } else {
        window.position(now.date(), now) == WindowPosition::After
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_str_round_trip() {
        for p in [
            Period::Once,
            Period::Day,
            Period::TwoDay,
            Period::Weekly,
            Period::TwoWeek,
            Period::Monthly,
            Period::Quarterly,
            Period::SixMonths,
            Period::Yearly,
        ] {
            assert_eq!(Period::from_str(p.as_str()), Some(p));
        }
        assert_eq!(Period::from_str("fortnight"), None);
    }

    #[test]
    fn test_next_schedule_day_periods() {
        let d = date(2024, 1, 15);
        assert_eq!(next_schedule_time(Period::Day, d), date(2024, 1, 16));
        assert_eq!(next_schedule_time(Period::TwoDay, d), date(2024, 1, 17));
        assert_eq!(next_schedule_time(Period::Weekly, d), date(2024, 1, 22));
        assert_eq!(next_schedule_time(Period::TwoWeek, d), date(2024, 1, 29));
        assert_eq!(next_schedule_time(Period::Once, d), date(2024, 1, 16));
    }

    #[test]
    fn test_next_schedule_month_periods() {
        let d = date(2024, 1, 15);
        assert_eq!(next_schedule_time(Period::Monthly, d), date(2024, 2, 15));
        assert_eq!(next_schedule_time(Period::Quarterly, d), date(2024, 4, 15));
        assert_eq!(next_schedule_time(Period::SixMonths, d), date(2024, 7, 15));
        assert_eq!(next_schedule_time(Period::Yearly, d), date(2025, 1, 15));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_format_execute_date_clamps_short_months() {
        assert_eq!(
            format_execute_date(Period::Monthly, 31, date(2024, 4, 2)),
            date(2024, 4, 30)
        );
        assert_eq!(
            format_execute_date(Period::Monthly, 31, date(2024, 2, 2)),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn test_format_execute_date_ignores_day_for_short_periods() {
        assert_eq!(
            format_execute_date(Period::Weekly, 31, date(2024, 4, 2)),
            date(2024, 4, 2)
        );
    }

    #[test]
    fn test_missed_monthly_after_day() {
        let w = ExecuteWindow::parse("02:00:00", "05:00:00").unwrap();
        let now = date(2024, 1, 16).and_hms_opt(10, 0, 0).unwrap();
        assert!(missed_exec_date_and_window(Period::Monthly, 15, &w, now));
    }

    #[test]
    fn test_missed_monthly_on_day_window_closed() {
        let w = ExecuteWindow::parse("02:00:00", "05:00:00").unwrap();
        let now = date(2024, 1, 15).and_hms_opt(6, 0, 0).unwrap();
        assert!(missed_exec_date_and_window(Period::Monthly, 15, &w, now));
    }

    #[test]
    fn test_not_missed_monthly_before_day() {
        let w = ExecuteWindow::parse("02:00:00", "05:00:00").unwrap();
        let now = date(2024, 1, 10).and_hms_opt(10, 0, 0).unwrap();
        assert!(!missed_exec_date_and_window(Period::Monthly, 15, &w, now));
    }

    #[test]
    fn test_missed_daily_by_window_only() {
        let w = ExecuteWindow::parse("02:00:00", "05:00:00").unwrap();
        let before = date(2024, 1, 10).and_hms_opt(1, 0, 0).unwrap();
        let after = date(2024, 1, 10).and_hms_opt(6, 0, 0).unwrap();
        assert!(!missed_exec_date_and_window(Period::Day, 0, &w, before));
        assert!(missed_exec_date_and_window(Period::Day, 0, &w, after));
    }

    proptest! {
        // Advancing then formatting always lands on the policy day clamped to
        // the month length, and parses back to the same calendar day.
        #[test]
        fn prop_format_round_trip(day in 1u32..=31, month in 1u32..=12, dom in 1u32..=28) {
            let start = date(2024, month, dom);
            let next = next_schedule_time(Period::Monthly, start);
            let exec = format_execute_date(Period::Monthly, day, next);
            let expected_day = day.min(days_in_month(exec.year(), exec.month()));
            prop_assert_eq!(exec.day(), expected_day);
            let parsed = NaiveDate::parse_from_str(&exec.format("%Y-%m-%d").to_string(), "%Y-%m-%d").unwrap();
            prop_assert_eq!(parsed, exec);
        }
    }
}
