//! Helper utility functions for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use timebox_core::calendar::{
    format_date, format_datetime, latin_digits, parse_jalali_date, parse_jalali_datetime,
    FIRST_GREGORIAN_YEAR,
};
use timebox_core::{Language, TimeboxConfig};
use timebox_storage::{Category, Database};

const RULE: &str = "\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}";

/// Open the configured database, creating it on first use
pub fn open_database(config: &TimeboxConfig) -> Result<Database> {
    Database::new(config.database_path.clone()).context("Failed to open database")
}

pub fn print_heading(title: &str) {
    println!("\n{title}");
    println!("{RULE}");
}

/// Safely truncate a string to a maximum number of characters (not bytes).
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// `YYYY-MM-DD`, `today` or `yesterday`; Jalali `YYYY/MM/DD` (or a year before 1700) also works
pub fn parse_date(raw: &str, today: NaiveDate) -> Result<NaiveDate> {
    match latin_digits(raw.trim()).to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .ok()
            .filter(|date| date.year() >= FIRST_GREGORIAN_YEAR)
            .or_else(|| parse_jalali_date(other))
            .with_context(|| {
                format!("Invalid date '{raw}', expected YYYY-MM-DD or Jalali YYYY/MM/DD")
            }),
    }
}

/// `YYYY-MM-DD HH:MM` in UTC, or the Jalali equivalent; a bare date means the end of that day
pub fn parse_due(raw: &str, today: NaiveDate) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let latin = latin_digits(raw);
    if let Ok(dt) = NaiveDateTime::parse_from_str(&latin, "%Y-%m-%d %H:%M") {
        if dt.year() >= FIRST_GREGORIAN_YEAR {
            return Ok(dt.and_utc());
        }
    }
    if latin.contains(' ') {
        if let Some(dt) = parse_jalali_datetime(&latin) {
            return Ok(dt.and_utc());
        }
    }
    let date = parse_date(raw, today)
        .with_context(|| format!("Invalid due date '{raw}', expected YYYY-MM-DD [HH:MM]"))?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);
    Ok(date.and_time(end_of_day).and_utc())
}

/// Category by numeric id or by exact name
pub fn resolve_category(db: &Database, key: &str) -> Result<Category> {
    let found = match key.parse::<i64>() {
        Ok(id) => db.get_category(id)?,
        Err(_) => db.find_category_by_name(key)?,
    };
    found.with_context(|| format!("No category '{key}'. See `timebox category list`"))
}

pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn short_time(language: Language, dt: DateTime<Utc>) -> String {
    format_datetime(language, dt)
}

pub fn show_date(language: Language, date: NaiveDate) -> String {
    format_date(language, date)
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_truncate_str_long() {
        assert_eq!(truncate_str("hello world", 5), "hello...");
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_str_unicode() {
        assert_eq!(truncate_str("\u{1f4bc}\u{1f4aa}\u{1f4da}", 2), "\u{1f4bc}\u{1f4aa}...");
    }

    #[test]
    fn test_parse_date_keywords() {
        assert_eq!(parse_date("today", today()).unwrap(), today());
        assert_eq!(
            parse_date("Yesterday", today()).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert_eq!(
            parse_date("2024-01-31", today()).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );
        assert!(parse_date("31/01/2024", today()).is_err());
    }

    #[test]
    fn test_parse_due() {
        assert_eq!(
            parse_due("2024-03-12 09:30", today()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 12, 9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_due("2024-03-12", today()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 12, 23, 59, 0).unwrap()
        );
        assert!(parse_due("soon", today()).is_err());
    }

    #[test]
    fn test_parse_jalali_input() {
        let mehr_first = NaiveDate::from_ymd_opt(2024, 9, 22).unwrap();
        assert_eq!(parse_date("1403/07/01", today()).unwrap(), mehr_first);
        assert_eq!(parse_date("1403-07-01", today()).unwrap(), mehr_first);
        assert_eq!(parse_date("۱۴۰۳/۰۷/۰۱", today()).unwrap(), mehr_first);
        assert!(parse_date("1402/12/30", today()).is_err());

        assert_eq!(
            parse_due("1403/07/01 08:15", today()).unwrap(),
            Utc.with_ymd_and_hms(2024, 9, 22, 8, 15, 0).unwrap()
        );
        assert_eq!(
            parse_due("1403/07/01", today()).unwrap(),
            Utc.with_ymd_and_hms(2024, 9, 22, 23, 59, 0).unwrap()
        );
    }

    #[test]
    fn test_display_follows_language() {
        let at = Utc.with_ymd_and_hms(2024, 9, 22, 8, 15, 0).unwrap();
        assert_eq!(short_time(Language::En, at), "2024-09-22 08:15");
        assert_eq!(short_time(Language::Fa, at), "۱۴۰۳/۰۷/۰۱ ۰۸:۱۵");
        assert_eq!(show_date(Language::Fa, at.date_naive()), "۱۴۰۳/۰۷/۰۱");
    }

    #[test]
    fn test_resolve_category_by_id_or_name() {
        let db = Database::open_in_memory().unwrap();
        let work = resolve_category(&db, "Work & Career").unwrap();
        assert_eq!(resolve_category(&db, &work.id.to_string()).unwrap().name, work.name);
        assert!(resolve_category(&db, "Gardening").is_err());
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(Some(4)), "4");
        assert_eq!(or_dash::<u8>(None), "-");
    }
}
