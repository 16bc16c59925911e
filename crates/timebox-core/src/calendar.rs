//! Jalali (Persian) calendar conversion and language-aware date display.
//!
//! Dates are always stored in the Gregorian calendar; this module converts at the
//! edges. Conversion follows the 33-year leap cycle with the table of break years,
//! valid for Jalali years -61..3177.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Jalali years where the leap pattern of the 33-year cycle shifts
const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

/// Gregorian years below this are read as Jalali years
pub const FIRST_GREGORIAN_YEAR: i32 = 1700;

/// Saturday first, the Persian week
const PERSIAN_WEEKDAYS: [&str; 7] = [
    "شنبه",
    "یکشنبه",
    "دوشنبه",
    "سه‌شنبه",
    "چهارشنبه",
    "پنجشنبه",
    "جمعه",
];

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// Display language; Persian shows Jalali dates with Persian digits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fa,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "fa" | "persian" | "farsi" => Ok(Self::Fa),
            other => Err(format!("Unknown language '{other}' (expected en or fa)")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::En => "en",
            Self::Fa => "fa",
        })
    }
}

/// A day in the Jalali calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JalaliDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

struct YearInfo {
    /// Years since the last leap year; zero means this year is leap
    leap: i32,
    gregorian_year: i32,
    /// Day of March on which Farvardin 1 falls
    march: u32,
}

fn year_info(year: i32) -> Option<YearInfo> {
    if year < BREAKS[0] || year >= BREAKS[BREAKS.len() - 1] {
        return None;
    }
    let gregorian_year = year + 621;
    let mut leap_j = -14;
    let mut previous = BREAKS[0];
    let mut jump = 0;
    for &brk in &BREAKS[1..] {
        jump = brk - previous;
        if year < brk {
            break;
        }
        leap_j += jump / 33 * 8 + (jump % 33) / 4;
        previous = brk;
    }
    let mut n = year - previous;
    leap_j += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }
    let leap_g = gregorian_year / 4 - (gregorian_year / 100 + 1) * 3 / 4 - 150;
    let march = u32::try_from(20 + leap_j - leap_g).ok()?;

    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }
    Some(YearInfo {
        leap,
        gregorian_year,
        march,
    })
}

impl JalaliDate {
    /// `None` when the day does not exist in that month
    #[must_use]
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = Self { year, month, day };
        (day >= 1 && day <= Self::month_length(year, month)?).then_some(date)
    }

    /// Days in a Jalali month; Esfand has 30 days in leap years
    #[must_use]
    pub fn month_length(year: i32, month: u32) -> Option<u32> {
        match month {
            1..=6 => Some(31),
            7..=11 => Some(30),
            12 => Some(if Self::is_leap_year(year) { 30 } else { 29 }),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_leap_year(year: i32) -> bool {
        year_info(year).is_some_and(|info| info.leap == 0)
    }

    #[must_use]
    pub fn from_gregorian(date: NaiveDate) -> Option<Self> {
        let mut year = date.year() - 621;
        let info = year_info(year)?;
        let first = NaiveDate::from_ymd_opt(info.gregorian_year, 3, info.march)?;
        let mut offset = date.signed_duration_since(first).num_days();
        if offset >= 0 {
            if offset <= 185 {
                return Self::from_offsets(year, 1 + offset / 31, offset % 31 + 1);
            }
            offset -= 186;
        } else {
            year -= 1;
            offset += 179;
            if info.leap == 1 {
                offset += 1;
            }
        }
        Self::from_offsets(year, 7 + offset / 30, offset % 30 + 1)
    }

    fn from_offsets(year: i32, month: i64, day: i64) -> Option<Self> {
        Some(Self {
            year,
            month: u32::try_from(month).ok()?,
            day: u32::try_from(day).ok()?,
        })
    }

    #[must_use]
    pub fn to_gregorian(self) -> Option<NaiveDate> {
        let info = year_info(self.year)?;
        let first = NaiveDate::from_ymd_opt(info.gregorian_year, 3, info.march)?;
        let month = i64::from(self.month);
        let offset = (month - 1) * 31 - month / 7 * (month - 7) + i64::from(self.day) - 1;
        first.checked_add_signed(Duration::days(offset))
    }

    /// Persian name of the weekday, the week starting on Saturday
    #[must_use]
    pub fn weekday_name(self) -> &'static str {
        self.to_gregorian().map_or("", |date| {
            let from_saturday = (date.weekday().num_days_from_monday() + 2) % 7;
            PERSIAN_WEEKDAYS[from_saturday as usize]
        })
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// Replace ASCII digits with Persian ones
#[must_use]
pub fn persian_digits(text: &str) -> String {
    text.chars()
        .map(|c| c.to_digit(10).map_or(c, |d| PERSIAN_DIGITS[d as usize]))
        .collect()
}

/// Replace Persian and Arabic-Indic digits with ASCII ones
#[must_use]
pub fn latin_digits(text: &str) -> String {
    text.chars()
        .map(|c| {
            let zero = match c {
                '۰'..='۹' => '۰',
                '٠'..='٩' => '٠',
                _ => return c,
            };
            char::from_digit(u32::from(c) - u32::from(zero), 10).unwrap_or(c)
        })
        .collect()
}

fn split_date(text: &str) -> Option<(i32, u32, u32)> {
    let mut parts = text.split(['/', '-']);
    let year = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    parts.next().is_none().then_some((year, month, day))
}

/// A Jalali `YYYY/MM/DD` (or `YYYY-MM-DD`) as a Gregorian date
#[must_use]
pub fn parse_jalali_date(text: &str) -> Option<NaiveDate> {
    let (year, month, day) = split_date(&latin_digits(text.trim()))?;
    JalaliDate::new(year, month, day)?.to_gregorian()
}

/// A Jalali date with an optional `HH:MM[:SS]`; without a time the day ends at 23:59
#[must_use]
pub fn parse_jalali_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = latin_digits(text.trim());
    let (date_part, time_part) = match text.split_once(' ') {
        Some((date, time)) => (date, Some(time.trim())),
        None => (text.as_str(), None),
    };
    let date = parse_jalali_date(date_part)?;
    let time = match time_part {
        Some(time) => NaiveTime::parse_from_str(time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok()?,
        None => NaiveTime::from_hms_opt(23, 59, 0)?,
    };
    Some(date.and_time(time))
}

/// Calendar day in the language's calendar: `2024-09-05` or `۱۴۰۳/۰۶/۱۵`
#[must_use]
pub fn format_date(language: Language, date: NaiveDate) -> String {
    match (language, JalaliDate::from_gregorian(date)) {
        (Language::Fa, Some(jalali)) => persian_digits(&jalali.to_string()),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}

/// Day and minute: `2024-09-05 14:30` or `۱۴۰۳/۰۶/۱۵ ۱۴:۳۰`
#[must_use]
pub fn format_datetime(language: Language, at: DateTime<Utc>) -> String {
    let clock = at.format("%H:%M").to_string();
    match language {
        Language::En => format!("{} {clock}", format_date(language, at.date_naive())),
        Language::Fa => format!(
            "{} {}",
            format_date(language, at.date_naive()),
            persian_digits(&clock)
        ),
    }
}

/// Weekday name followed by the date, e.g. `Thursday 2024-09-05` or `پنجشنبه ۱۴۰۳/۰۶/۱۵`
#[must_use]
pub fn format_date_full(language: Language, date: NaiveDate) -> String {
    match (language, JalaliDate::from_gregorian(date)) {
        (Language::Fa, Some(jalali)) => format!(
            "{} {}",
            jalali.weekday_name(),
            persian_digits(&jalali.to_string())
        ),
        _ => date.format("%A %Y-%m-%d").to_string(),
    }
}

/// "5 minutes ago" style distance from `at` to `now`
#[must_use]
pub fn relative_time(language: Language, at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const UNITS: [(i64, &str, &str); 6] = [
        (31_536_000, "year", "سال"),
        (2_592_000, "month", "ماه"),
        (604_800, "week", "هفته"),
        (86_400, "day", "روز"),
        (3_600, "hour", "ساعت"),
        (60, "minute", "دقیقه"),
    ];
    let seconds = now.signed_duration_since(at).num_seconds();
    let unit = UNITS.iter().find(|(size, _, _)| seconds >= *size);
    match (language, unit) {
        (Language::En, None) => "just now".to_string(),
        (Language::Fa, None) => "همین الان".to_string(),
        (Language::En, Some((size, name, _))) => {
            let count = seconds / size;
            let plural = if count == 1 { "" } else { "s" };
            format!("{count} {name}{plural} ago")
        }
        (Language::Fa, Some((size, _, name))) => {
            persian_digits(&format!("{} {name} پیش", seconds / size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_known_conversions() {
        let cases = [
            ((1403, 1, 1), ymd(2024, 3, 20)),
            ((1402, 1, 1), ymd(2023, 3, 21)),
            ((1402, 12, 29), ymd(2024, 3, 19)),
            ((1403, 6, 15), ymd(2024, 9, 5)),
            ((1403, 7, 1), ymd(2024, 9, 22)),
            ((1403, 12, 30), ymd(2025, 3, 20)),
            ((1399, 12, 30), ymd(2021, 3, 20)),
        ];
        for ((y, m, d), gregorian) in cases {
            let jalali = JalaliDate::new(y, m, d).unwrap();
            assert_eq!(jalali.to_gregorian(), Some(gregorian), "{jalali}");
            assert_eq!(JalaliDate::from_gregorian(gregorian), Some(jalali));
        }
    }

    #[test]
    fn test_every_day_converts_back() {
        let mut day = ymd(1990, 1, 1);
        while day < ymd(2060, 1, 1) {
            let jalali = JalaliDate::from_gregorian(day).unwrap();
            assert_eq!(jalali.to_gregorian(), Some(day));
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_leap_years_and_month_lengths() {
        assert!(JalaliDate::is_leap_year(1403));
        assert!(!JalaliDate::is_leap_year(1402));
        assert!(JalaliDate::new(1402, 12, 30).is_none());
        assert!(JalaliDate::new(1403, 7, 31).is_none());
        assert!(JalaliDate::new(1403, 13, 1).is_none());
        assert!(JalaliDate::new(1403, 1, 0).is_none());
    }

    #[test]
    fn test_digits() {
        assert_eq!(persian_digits("1403/06/15 14:30"), "۱۴۰۳/۰۶/۱۵ ۱۴:۳۰");
        assert_eq!(latin_digits("۱۴۰۳/۰۶/۱۵"), "1403/06/15");
        assert_eq!(latin_digits("٢٠"), "20");
    }

    #[test]
    fn test_parse_jalali_input() {
        assert_eq!(parse_jalali_date("1403/06/15"), Some(ymd(2024, 9, 5)));
        assert_eq!(parse_jalali_date("۱۴۰۳-۰۶-۱۵"), Some(ymd(2024, 9, 5)));
        assert_eq!(parse_jalali_date("1402/12/30"), None);
        assert_eq!(parse_jalali_date("1403/06"), None);

        let at = parse_jalali_datetime("1403/06/15 14:30").unwrap();
        assert_eq!(at, ymd(2024, 9, 5).and_hms_opt(14, 30, 0).unwrap());
        let end_of_day = parse_jalali_datetime("1403/06/15").unwrap();
        assert_eq!(end_of_day, ymd(2024, 9, 5).and_hms_opt(23, 59, 0).unwrap());
        assert!(parse_jalali_datetime("1403/06/15 25:00").is_none());
    }

    #[test]
    fn test_format_by_language() {
        let day = ymd(2024, 9, 5);
        assert_eq!(format_date(Language::En, day), "2024-09-05");
        assert_eq!(format_date(Language::Fa, day), "۱۴۰۳/۰۶/۱۵");
        assert_eq!(format_date_full(Language::En, day), "Thursday 2024-09-05");
        assert_eq!(format_date_full(Language::Fa, day), "پنجشنبه ۱۴۰۳/۰۶/۱۵");
        // Saturday starts the Persian week
        assert_eq!(JalaliDate::from_gregorian(ymd(2024, 9, 7)).unwrap().weekday_name(), "شنبه");

        let at = Utc.with_ymd_and_hms(2024, 9, 5, 14, 30, 0).unwrap();
        assert_eq!(format_datetime(Language::En, at), "2024-09-05 14:30");
        assert_eq!(format_datetime(Language::Fa, at), "۱۴۰۳/۰۶/۱۵ ۱۴:۳۰");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 9, 5, 14, 30, 0).unwrap();
        assert_eq!(relative_time(Language::En, now, now), "just now");
        assert_eq!(
            relative_time(Language::En, now - Duration::minutes(5), now),
            "5 minutes ago"
        );
        assert_eq!(relative_time(Language::En, now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(relative_time(Language::Fa, now - Duration::days(3), now), "۳ روز پیش");
        assert_eq!(relative_time(Language::Fa, now - Duration::seconds(20), now), "همین الان");
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("FA".parse::<Language>().unwrap(), Language::Fa);
        assert_eq!("english".parse::<Language>().unwrap(), Language::En);
        assert!("de".parse::<Language>().is_err());
    }
}
