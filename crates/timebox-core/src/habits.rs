//! Habit logging and streaks.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use timebox_storage::{Database, Habit, HabitFrequency, HabitLog};

/// Window used for the completion rate in summaries
pub const COMPLETION_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct HabitSummary {
    #[serde(flatten)]
    pub habit: Habit,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completion_rate: f64,
    pub completed_today: bool,
}

/// Record a habit for a date (overwrites an existing log for that date)
///
/// # Errors
///
/// Returns `NotFound` for an unknown habit or a database error
pub fn log_habit(
    db: &Database,
    habit_id: i64,
    date: NaiveDate,
    completed: bool,
    notes: &str,
) -> Result<HabitLog> {
    let log = db.log_habit(habit_id, date, completed, notes)?;
    log::info!(
        "Logged habit {habit_id} on {date}: {}",
        if completed { "done" } else { "missed" }
    );
    Ok(log)
}

/// Sequential index of the period a date falls in; consecutive periods differ by one
fn period_index(frequency: HabitFrequency, date: NaiveDate) -> i64 {
    match frequency {
        HabitFrequency::Daily => i64::from(date.num_days_from_ce()),
        HabitFrequency::Weekly => {
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            i64::from(monday.num_days_from_ce()).div_euclid(7)
        }
        HabitFrequency::Monthly => i64::from(date.year()) * 12 + i64::from(date.month0()),
    }
}

/// Periods whose completed logs reach the habit's target
fn satisfied_periods(habit: &Habit, logs: &[HabitLog]) -> HashSet<i64> {
    let needed = match habit.frequency {
        HabitFrequency::Daily => 1,
        HabitFrequency::Weekly | HabitFrequency::Monthly => habit.target_per_period.max(1),
    };
    let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
    for log in logs.iter().filter(|l| l.completed) {
        *counts.entry(period_index(habit.frequency, log.date)).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= needed)
        .map(|(index, _)| index)
        .collect()
}

/// Consecutive satisfied periods ending with the current one. The current period
/// may still be open, so the count starts from the previous period when the
/// current one is not yet satisfied.
#[must_use]
pub fn current_streak(habit: &Habit, logs: &[HabitLog], today: NaiveDate) -> u32 {
    let satisfied = satisfied_periods(habit, logs);
    let mut index = period_index(habit.frequency, today);
    if !satisfied.contains(&index) {
        index -= 1;
    }
    let mut streak = 0;
    while satisfied.contains(&index) {
        streak += 1;
        index -= 1;
    }
    streak
}

#[must_use]
pub fn longest_streak(habit: &Habit, logs: &[HabitLog]) -> u32 {
    let mut indices: Vec<i64> = satisfied_periods(habit, logs).into_iter().collect();
    indices.sort_unstable();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<i64> = None;
    for index in indices {
        run = if previous == Some(index - 1) { run + 1 } else { 1 };
        longest = longest.max(run);
        previous = Some(index);
    }
    longest
}

/// Completed days in `[start, end]` as a percentage of the days in that range
#[must_use]
pub fn completion_rate(logs: &[HabitLog], start: NaiveDate, end: NaiveDate) -> f64 {
    if end < start {
        return 0.0;
    }
    let days = (end - start).num_days() + 1;
    let completed = logs
        .iter()
        .filter(|l| l.completed && l.date >= start && l.date <= end)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let rate = completed as f64 / days as f64 * 100.0;
    timebox_storage::validation::clamp_percentage(rate)
}

/// Consecutive days ending today with at least one session
#[must_use]
pub fn session_streak(session_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = session_dates.iter().copied().collect();
    let mut day = today;
    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Streaks and recent completion rate for every habit
///
/// # Errors
///
/// Returns an error if any database query fails
pub fn habit_summaries(
    db: &Database,
    active_only: bool,
    today: NaiveDate,
) -> Result<Vec<HabitSummary>> {
    let window_start = today - Duration::days(COMPLETION_WINDOW_DAYS - 1);
    db.list_habits(active_only)?
        .into_iter()
        .map(|habit| {
            let logs = db.habit_logs(habit.id)?;
            Ok(HabitSummary {
                current_streak: current_streak(&habit, &logs, today),
                longest_streak: longest_streak(&habit, &logs),
                completion_rate: completion_rate(&logs, window_start, today),
                completed_today: logs.iter().any(|l| l.date == today && l.completed),
                habit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(day: NaiveDate, completed: bool) -> HabitLog {
        HabitLog {
            id: 0,
            habit_id: 1,
            date: day,
            completed,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    fn daily() -> Habit {
        Habit::new("Read", 1, HabitFrequency::Daily)
    }

    #[test]
    fn test_daily_streak_counts_through_today() {
        let today = date(2024, 3, 10);
        let logs = vec![
            log(date(2024, 3, 7), true),
            log(date(2024, 3, 8), true),
            log(date(2024, 3, 9), true),
            log(date(2024, 3, 10), true),
        ];
        assert_eq!(current_streak(&daily(), &logs, today), 4);
    }

    #[test]
    fn test_daily_streak_allows_unlogged_today() {
        let today = date(2024, 3, 10);
        let logs = vec![log(date(2024, 3, 8), true), log(date(2024, 3, 9), true)];
        assert_eq!(current_streak(&daily(), &logs, today), 2);
    }

    #[test]
    fn test_daily_streak_broken_by_miss() {
        let today = date(2024, 3, 10);
        let logs = vec![
            log(date(2024, 3, 6), true),
            log(date(2024, 3, 7), false),
            log(date(2024, 3, 8), true),
        ];
        assert_eq!(current_streak(&daily(), &logs, today), 0);
        assert_eq!(longest_streak(&daily(), &logs), 1);
    }

    #[test]
    fn test_weekly_streak_needs_target() {
        let mut habit = Habit::new("Gym", 1, HabitFrequency::Weekly);
        habit.target_per_period = 2;
        // weeks of Feb 26, Mar 4 satisfied; week of Mar 11 only once so far
        let logs = vec![
            log(date(2024, 2, 27), true),
            log(date(2024, 3, 1), true),
            log(date(2024, 3, 5), true),
            log(date(2024, 3, 9), true),
            log(date(2024, 3, 12), true),
        ];
        assert_eq!(current_streak(&habit, &logs, date(2024, 3, 13)), 2);
        assert_eq!(longest_streak(&habit, &logs), 2);
    }

    #[test]
    fn test_monthly_streak_crosses_year() {
        let habit = Habit::new("Budget review", 1, HabitFrequency::Monthly);
        let logs = vec![
            log(date(2023, 11, 30), true),
            log(date(2023, 12, 2), true),
            log(date(2024, 1, 15), true),
        ];
        assert_eq!(current_streak(&habit, &logs, date(2024, 1, 20)), 3);
    }

    #[test]
    fn test_completion_rate() {
        let logs = vec![
            log(date(2024, 3, 1), true),
            log(date(2024, 3, 2), false),
            log(date(2024, 3, 3), true),
            log(date(2024, 2, 20), true),
        ];
        let rate = completion_rate(&logs, date(2024, 3, 1), date(2024, 3, 4));
        assert!((rate - 50.0).abs() < 1e-9);
        assert!(completion_rate(&logs, date(2024, 3, 4), date(2024, 3, 1)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_session_streak_requires_today() {
        let today = date(2024, 3, 10);
        let dates = vec![date(2024, 3, 10), date(2024, 3, 9), date(2024, 3, 7)];
        assert_eq!(session_streak(&dates, today), 2);
        assert_eq!(session_streak(&dates, date(2024, 3, 11)), 0);
    }
}
