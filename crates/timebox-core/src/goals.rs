//! Goal periods and progress toward the hour target.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use timebox_storage::{Database, Goal, GoalPeriod, GoalStatus};

/// A goal with its progress in the current period
#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: Goal,
    /// 0..=100
    pub progress: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub minutes_logged: u32,
}

/// First and last day (inclusive) of the period containing `today`
#[must_use]
pub fn period_bounds(period: GoalPeriod, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        GoalPeriod::Daily => (today, today),
        GoalPeriod::Weekly => {
            let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (start, start + Duration::days(6))
        }
        GoalPeriod::Monthly => month_bounds(today.year(), today.month()),
        GoalPeriod::Quarterly => {
            let first_month = (today.month0() / 3) * 3 + 1;
            let (start, _) = month_bounds(today.year(), first_month);
            let (_, end) = month_bounds(today.year(), first_month + 2);
            (start, end)
        }
        GoalPeriod::Yearly => (
            NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
        ),
    }
}

fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .unwrap_or(start);
    (start, next - Duration::days(1))
}

/// Percentage of the target reached, capped to 0..=100
#[must_use]
pub fn progress_percentage(minutes: u32, target_hours: f64) -> f64 {
    let target_minutes = target_hours * 60.0;
    if target_minutes <= 0.0 {
        return 0.0;
    }
    timebox_storage::validation::clamp_percentage(f64::from(minutes) / target_minutes * 100.0)
}

/// Progress of a goal in the period that contains `today`
///
/// # Errors
///
/// Returns an error if the database query fails
pub fn current_period_progress(db: &Database, goal: &Goal, today: NaiveDate) -> Result<GoalProgress> {
    let (period_start, period_end) = period_bounds(goal.period, today);
    let minutes_logged =
        db.productive_minutes_for_category(goal.category_id, period_start, period_end)?;
    Ok(GoalProgress {
        goal: goal.clone(),
        progress: progress_percentage(minutes_logged, goal.target_hours_per_period),
        period_start,
        period_end,
        minutes_logged,
    })
}

/// Goals (optionally filtered by status) with their current progress
///
/// # Errors
///
/// Returns an error if any database query fails
pub fn goals_with_progress(
    db: &Database,
    status: Option<GoalStatus>,
    today: NaiveDate,
) -> Result<Vec<GoalProgress>> {
    db.list_goals(status)?
        .iter()
        .map(|goal| current_period_progress(db, goal, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_bounds_start_monday() {
        // 2024-03-14 is a Thursday
        assert_eq!(
            period_bounds(GoalPeriod::Weekly, date(2024, 3, 14)),
            (date(2024, 3, 11), date(2024, 3, 17))
        );
        assert_eq!(
            period_bounds(GoalPeriod::Weekly, date(2024, 3, 11)),
            (date(2024, 3, 11), date(2024, 3, 17))
        );
    }

    #[test]
    fn test_monthly_bounds_handle_leap_and_december() {
        assert_eq!(
            period_bounds(GoalPeriod::Monthly, date(2024, 2, 10)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            period_bounds(GoalPeriod::Monthly, date(2023, 12, 31)),
            (date(2023, 12, 1), date(2023, 12, 31))
        );
    }

    #[test]
    fn test_quarterly_and_yearly_bounds() {
        assert_eq!(
            period_bounds(GoalPeriod::Quarterly, date(2024, 5, 20)),
            (date(2024, 4, 1), date(2024, 6, 30))
        );
        assert_eq!(
            period_bounds(GoalPeriod::Quarterly, date(2024, 12, 1)),
            (date(2024, 10, 1), date(2024, 12, 31))
        );
        assert_eq!(
            period_bounds(GoalPeriod::Yearly, date(2024, 7, 4)),
            (date(2024, 1, 1), date(2024, 12, 31))
        );
        assert_eq!(
            period_bounds(GoalPeriod::Daily, date(2024, 7, 4)),
            (date(2024, 7, 4), date(2024, 7, 4))
        );
    }

    #[test]
    fn test_progress_percentage_caps() {
        assert!((progress_percentage(90, 3.0) - 50.0).abs() < 1e-9);
        assert!((progress_percentage(600, 2.0) - 100.0).abs() < 1e-9);
        assert!(progress_percentage(60, 0.0).abs() < f64::EPSILON);
    }
}
