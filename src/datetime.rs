//! Date/time helpers for the SQLite timestamp format used by the index.
//!
//! The index stores UTC timestamps as `YYYY-MM-DD HH:MM:SS`, the same shape
//! SQLite's `datetime('now')` produces, so values written from Rust compare
//! correctly against values defaulted by the database.

use chrono::{DateTime, NaiveDateTime, Utc};

const SQLITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC datetime the way the index stores it.
pub fn to_sqlite(dt: &DateTime<Utc>) -> String {
    dt.format(SQLITE_FORMAT).to_string()
}

/// Parse an index timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
pub fn parse_sqlite(datetime_str: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(datetime_str, SQLITE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert an index timestamp to RFC3339 for API responses.
///
/// Strings that are not in the index format are returned unchanged.
pub fn to_rfc3339(datetime_str: &str) -> String {
    match parse_sqlite(datetime_str) {
        Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        None => datetime_str.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_sqlite() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(to_sqlite(&dt), "2024-01-15 10:30:00");
    }

    #[test]
    fn test_parse_sqlite() {
        let dt = parse_sqlite("2024-12-31 23:59:59").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        assert!(parse_sqlite("not a date").is_none());
    }

    #[test]
    fn test_to_rfc3339() {
        assert_eq!(to_rfc3339("2024-01-15 10:30:00"), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_to_rfc3339_passthrough() {
        assert_eq!(to_rfc3339("yesterday"), "yesterday");
    }
}
