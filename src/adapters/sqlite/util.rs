//! Row conversion helpers shared by the SQLite repositories.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::errors::{DomainError, DomainResult};

pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(format!("bad timestamp '{s}': {e}")))
}

pub fn parse_opt_datetime(s: Option<&str>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(parse_datetime).transpose()
}

pub fn parse_date(s: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DomainError::SerializationError(format!("bad date '{s}': {e}")))
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// `?, ?, ...` for binding a dynamic IN list.
pub fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n.saturating_mul(2));
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }

    #[test]
    fn test_date_round_trip() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_date(&format_date(d)).unwrap(), d);
        assert!(parse_date("2024-13-01").is_err());
    }
}
