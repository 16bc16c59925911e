//! Database helper functions for safe type conversions.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use std::str::FromStr;

/// Fixed-width RFC3339 so stored timestamps compare correctly as text.
pub fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse an RFC3339 datetime string from database, returning a rusqlite error on failure.
pub fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub fn parse_opt_datetime(s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_datetime).transpose()
}

pub fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub fn parse_opt_date(s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.as_deref().map(parse_date).transpose()
}

/// Parse a stored choice key into its enum.
pub fn parse_choice<T: FromStr<Err = String>>(s: &str) -> rusqlite::Result<T> {
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
    })
}

pub fn to_u32(value: i64) -> rusqlite::Result<u32> {
    u32::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

/// SQL `SUM` totals saturate instead of failing the query
pub fn sum_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

pub fn to_u8(value: i64) -> rusqlite::Result<u8> {
    u8::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

/// `[start of first day, start of the day after last)` as stored text bounds
pub fn day_bounds(first: NaiveDate, last: NaiveDate) -> (String, String) {
    let start = first.and_time(NaiveTime::MIN).and_utc();
    let end = (last + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
    (fmt_datetime(start), fmt_datetime(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_text_sorts_chronologically() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 9, 59, 59).unwrap();
        let b = a + Duration::milliseconds(1);
        assert!(fmt_datetime(a) < fmt_datetime(b));
        assert_eq!(parse_datetime(&fmt_datetime(b)).unwrap(), b);
    }

    #[test]
    fn test_day_bounds_cover_whole_days() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let (start, end) = day_bounds(day, day + Duration::days(1));
        assert_eq!(start, "2024-02-28T00:00:00.000000Z");
        assert_eq!(end, "2024-03-01T00:00:00.000000Z");
    }

    #[test]
    fn test_bad_values_become_conversion_errors() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(to_u8(300).is_err());
        assert!(parse_choice::<crate::models::Theme>("neon").is_err());
    }

    #[test]
    fn test_sum_saturates() {
        assert_eq!(sum_to_u32(90), 90);
        assert_eq!(sum_to_u32(6_000_000_000), u32::MAX);
        assert_eq!(sum_to_u32(-5), 0);
    }
}
