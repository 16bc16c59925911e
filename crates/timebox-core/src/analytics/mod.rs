//! Dashboard figures, period statistics and productivity insights.


use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeDelta, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use timebox_storage::{
    CategoryMinutes, Database, EnergyLevel, GoalStatus, Preferences, Priority, Session,
    SessionDetail, SessionOutcome, Task, TaskCounts,
};

use crate::goals::{goals_with_progress, GoalProgress};

/// Period used when none (or an invalid one) is requested
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Longest period a caller can ask for, about ten years
pub const MAX_PERIOD_DAYS: i64 = 3650;

pub const NO_DATA: &str = "No data";

const DISTRACTION_KEYWORDS: &[&str] = &[
    "phone",
    "notification",
    "email",
    "social media",
    "noise",
    "interruption",
    "meeting",
    "call",
    "message",
    "hungry",
    "tired",
    "thoughts",
    "worry",
    "procrastination",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

// ==================== Result Types ====================

/// Activity on a single day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DayStats {
    pub sessions_count: u32,
    pub total_minutes: u32,
    pub avg_focus: f64,
    pub completed_tasks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub label: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub active_session: Option<SessionDetail>,
    pub today: DayStats,
    pub pending_tasks: Vec<Task>,
    pub category_minutes: Vec<CategoryMinutes>,
    pub active_goals: Vec<GoalProgress>,
    pub recent_sessions: Vec<SessionDetail>,
    pub task_counts: TaskCounts,
    pub priority_counts: Vec<PriorityCount>,
    /// Minutes for the last seven days, oldest first, ending today
    pub weekly_minutes: Vec<u32>,
    pub weekday_labels: Vec<String>,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TodaySummary {
    pub sessions: u32,
    pub minutes: u32,
    pub avg_focus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardStats {
    pub today: TodaySummary,
    pub pending_tasks: u32,
    pub active_goals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickStats {
    pub today_sessions: u32,
    pub active_session: bool,
    pub pending_tasks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub sessions: u32,
    pub minutes: u32,
    pub hours: f64,
    pub avg_focus: f64,
    pub avg_session_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub sessions: u32,
    pub minutes: u32,
    pub avg_focus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub total_minutes: u32,
    pub session_count: u32,
}

impl From<CategoryMinutes> for CategoryBreakdown {
    fn from(c: CategoryMinutes) -> Self {
        Self {
            id: c.category_id,
            name: c.name,
            color: c.color,
            icon: c.icon,
            total_minutes: c.minutes,
            session_count: c.sessions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsStats {
    /// Number of days, as text
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub totals: PeriodTotals,
    pub daily: Vec<DailyPoint>,
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub total_sessions: u32,
    pub total_hours: f64,
    pub avg_focus_rating: f64,
    pub most_productive_hour: String,
    pub best_focus_day: String,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_sessions: u32,
    pub total_minutes: u32,
    pub avg_focus: f64,
    pub completion_rate: f64,
    pub daily_breakdown: Vec<DailyPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistractionCount {
    pub keyword: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyPatterns {
    /// Average energy before sessions, keyed by start hour
    pub hourly_energy: BTreeMap<u32, f64>,
    pub peak_hours: Vec<u32>,
    pub best_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub message: &'static str,
    pub action: &'static str,
}

// ==================== Pure Calculations ====================

/// Round to one decimal place
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn usable_period(days: i64) -> Option<i64> {
    (1..=MAX_PERIOD_DAYS).contains(&days).then_some(days)
}

/// Parse a requested period in days; zero, negative, too long or garbage means 30
#[must_use]
pub fn parse_period(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(usable_period)
        .unwrap_or(DEFAULT_PERIOD_DAYS)
}

/// First and last day of the `days`-long window ending `today`
#[must_use]
pub fn period_range(days: i64, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back =
        TimeDelta::try_days(days.clamp(1, MAX_PERIOD_DAYS) - 1).unwrap_or_else(TimeDelta::zero);
    (today.checked_sub_signed(back).unwrap_or(NaiveDate::MIN), today)
}

/// Monday of the week containing `date`
#[must_use]
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// "45m", "2h" or "2h 5m"
#[must_use]
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}m")
    }
}

/// Focus (40), time efficiency (30) and outcome (30) combined into 0..=100
#[must_use]
pub fn session_productivity_score(session: &Session) -> f64 {
    let Some(focus) = session.focus_rating else {
        return 0.0;
    };
    let focus_score = f64::from(focus) / 5.0 * 40.0;
    let efficiency_score = match session.actual_minutes {
        Some(actual) if actual > 0 && session.planned_minutes > 0 => {
            (f64::from(session.planned_minutes) / f64::from(actual)).min(1.0) * 30.0
        }
        _ => 0.0,
    };
    let outcome_score = match session.outcome {
        Some(SessionOutcome::Completed) => 30.0,
        Some(SessionOutcome::Partial) => 20.0,
        Some(SessionOutcome::Interrupted) => 10.0,
        Some(SessionOutcome::Abandoned) | None => 0.0,
    };
    (focus_score + efficiency_score + outcome_score).clamp(0.0, 100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / f64::from(count))
}

fn average_focus<'a>(sessions: impl Iterator<Item = &'a Session>) -> f64 {
    mean(sessions.filter_map(|s| s.focus_rating).map(f64::from)).unwrap_or(0.0)
}

fn total_minutes<'a>(sessions: impl Iterator<Item = &'a Session>) -> u32 {
    sessions
        .filter_map(|s| s.actual_minutes)
        .fold(0, u32::saturating_add)
}

/// Percentage of sessions that ended as completed
#[must_use]
pub fn completion_rate(sessions: &[&Session]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let completed = sessions
        .iter()
        .filter(|s| s.outcome == Some(SessionOutcome::Completed))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let rate = completed as f64 / sessions.len() as f64 * 100.0;
    rate
}

/// Start hour ("HH:00") with the best average focus; earliest hour wins ties
#[must_use]
pub fn most_productive_hour(sessions: &[&Session]) -> String {
    let mut best: Option<(u32, f64)> = None;
    for hour in 0..24 {
        let in_hour: Vec<&Session> = sessions
            .iter()
            .copied()
            .filter(|s| s.start_time.hour() == hour)
            .collect();
        if in_hour.is_empty() {
            continue;
        }
        let focus = average_focus(in_hour.into_iter());
        if best.map_or(true, |(_, top)| focus > top) {
            best = Some((hour, focus));
        }
    }
    best.map_or_else(|| NO_DATA.to_string(), |(hour, _)| format!("{hour:02}:00"))
}

/// Weekday name with the best average focus; earliest in the week wins ties
#[must_use]
pub fn best_focus_day(sessions: &[&Session]) -> String {
    let mut best: Option<(usize, f64)> = None;
    for (index, _) in WEEKDAY_NAMES.iter().enumerate() {
        let on_day: Vec<&Session> = sessions
            .iter()
            .copied()
            .filter(|s| s.start_time.weekday().num_days_from_monday() as usize == index)
            .collect();
        if on_day.is_empty() {
            continue;
        }
        let focus = average_focus(on_day.into_iter());
        if best.map_or(true, |(_, top)| focus > top) {
            best = Some((index, focus));
        }
    }
    best.map_or_else(|| NO_DATA.to_string(), |(index, _)| WEEKDAY_NAMES[index].to_string())
}

/// Per-day sessions, minutes and focus for every day in `[first, last]`
#[must_use]
pub fn daily_series(sessions: &[&Session], first: NaiveDate, last: NaiveDate) -> Vec<DailyPoint> {
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|date| {
            let on_day: Vec<&Session> = sessions
                .iter()
                .copied()
                .filter(|s| s.start_time.date_naive() == date)
                .collect();
            DailyPoint {
                date,
                sessions: u32::try_from(on_day.len()).unwrap_or(u32::MAX),
                minutes: total_minutes(on_day.iter().copied()),
                avg_focus: average_focus(on_day.into_iter()),
            }
        })
        .collect()
}

/// Keyword counts over distraction notes, most frequent first, at most five
#[must_use]
pub fn count_distractions(notes: &[&str]) -> Vec<DistractionCount> {
    let lowered: Vec<String> = notes.iter().map(|n| n.to_lowercase()).collect();
    let mut counts: Vec<DistractionCount> = DISTRACTION_KEYWORDS
        .iter()
        .map(|&keyword| DistractionCount {
            keyword,
            count: u32::try_from(lowered.iter().filter(|n| n.contains(keyword)).count())
                .unwrap_or(u32::MAX),
        })
        .filter(|c| c.count > 0)
        .collect();
    // stable sort keeps keyword order for ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(5);
    counts
}

/// Average energy by start hour and the hours within half a point of the best
#[must_use]
pub fn energy_by_hour(sessions: &[&Session]) -> EnergyPatterns {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for session in sessions {
        if let Some(energy) = session.energy_before {
            by_hour
                .entry(session.start_time.hour())
                .or_default()
                .push(f64::from(energy));
        }
    }
    let hourly_energy: BTreeMap<u32, f64> = by_hour
        .into_iter()
        .filter_map(|(hour, values)| mean(values.into_iter()).map(|avg| (hour, round1(avg))))
        .collect();

    let Some(max) = hourly_energy.values().copied().reduce(f64::max) else {
        return EnergyPatterns {
            hourly_energy,
            peak_hours: Vec::new(),
            best_time: NO_DATA.to_string(),
        };
    };
    let peak_hours: Vec<u32> = hourly_energy
        .iter()
        .filter(|(_, energy)| **energy >= max - 0.5)
        .map(|(hour, _)| *hour)
        .collect();
    let best_time = match (peak_hours.first(), peak_hours.last()) {
        (Some(first), Some(last)) => format!("{first:02}:00-{:02}:00", last + 1),
        _ => NO_DATA.to_string(),
    };
    EnergyPatterns {
        hourly_energy,
        peak_hours,
        best_time,
    }
}

/// Energy-before ratings that match a task's energy level
#[must_use]
pub const fn energy_band(level: EnergyLevel) -> (u8, u8) {
    match level {
        EnergyLevel::Low => (1, 2),
        EnergyLevel::Medium => (3, 3),
        EnergyLevel::High => (4, 5),
    }
}

/// Length suggested when there is no focused history to learn from
#[must_use]
pub const fn default_session_length(level: Option<EnergyLevel>) -> u32 {
    match level {
        Some(EnergyLevel::Low) => 45,
        Some(EnergyLevel::High) => 60,
        Some(EnergyLevel::Medium) | None => 25,
    }
}

/// Average of past lengths rounded to the nearest five minutes, within 15..=120
#[must_use]
pub fn suggested_length(minutes: &[u32]) -> Option<u32> {
    let avg = mean(minutes.iter().map(|m| f64::from(*m)))?;
    let rounded = (avg / 5.0).round_ties_even() * 5.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let suggested = rounded.clamp(15.0, 120.0) as u32;
    Some(suggested)
}

// ==================== Database-Backed Reports ====================

/// Reports computed over a borrowed database
pub struct Analytics<'a> {
    db: &'a Database,
}

impl<'a> Analytics<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn day_stats(&self, date: NaiveDate) -> Result<DayStats> {
        let totals = self.db.session_totals(date, date)?;
        Ok(DayStats {
            sessions_count: totals.sessions,
            total_minutes: totals.minutes,
            avg_focus: totals.avg_focus.unwrap_or(0.0),
            completed_tasks: self.db.completed_tasks_on(date)?,
        })
    }

    /// Everything the home screen shows
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn dashboard(&self, now: DateTime<Utc>) -> Result<Dashboard> {
        let today = now.date_naive();

        let active_session = match self.db.active_session()? {
            Some(session) => self.db.get_session_detail(session.id)?,
            None => None,
        };
        let category_minutes = self
            .db
            .category_minutes_between(today, today, true)?
            .into_iter()
            .filter(|c| c.minutes > 0)
            .collect();
        let mut active_goals = goals_with_progress(self.db, Some(GoalStatus::Active), today)?;
        active_goals.truncate(3);

        let priority_counts = self
            .db
            .pending_counts_by_priority()?
            .into_iter()
            .map(|(priority, count)| PriorityCount {
                priority,
                label: priority.label(),
                count,
            })
            .collect();

        let days: Vec<NaiveDate> = (0..7).rev().map(|i| today - Duration::days(i)).collect();
        let mut weekly_minutes = Vec::with_capacity(days.len());
        for day in &days {
            weekly_minutes.push(self.db.session_totals(*day, *day)?.minutes);
        }
        let weekday_labels = days.iter().map(|d| d.format("%a").to_string()).collect();

        Ok(Dashboard {
            active_session,
            today: self.day_stats(today)?,
            pending_tasks: self.db.pending_tasks(5)?,
            category_minutes,
            active_goals,
            recent_sessions: self.db.recent_sessions(5)?,
            task_counts: self.db.task_counts(now)?,
            priority_counts,
            weekly_minutes,
            weekday_labels,
            preferences: self.db.get_preferences()?,
        })
    }

    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let today = now.date_naive();
        let totals = self.db.session_totals(today, today)?;
        let active_goals = self.db.list_goals(Some(GoalStatus::Active))?.len();
        Ok(DashboardStats {
            today: TodaySummary {
                sessions: totals.sessions,
                minutes: totals.minutes,
                avg_focus: totals.avg_focus.unwrap_or(0.0),
            },
            pending_tasks: self.db.count_pending_tasks()?,
            active_goals: u32::try_from(active_goals).unwrap_or(u32::MAX),
        })
    }

    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn quick_stats(&self, now: DateTime<Utc>) -> Result<QuickStats> {
        let today = now.date_naive();
        Ok(QuickStats {
            today_sessions: self.db.session_totals(today, today)?.sessions,
            active_session: self.db.active_session()?.is_some(),
            pending_tasks: self.db.count_pending_tasks()?,
        })
    }

    /// Totals, a daily series and a category breakdown over the last `days` days
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn analytics_stats(&self, days: i64, now: DateTime<Utc>) -> Result<AnalyticsStats> {
        let days = usable_period(days).unwrap_or(DEFAULT_PERIOD_DAYS);
        let (start_date, end_date) = period_range(days, now.date_naive());

        let details = self.db.session_details_between(start_date, end_date)?;
        let sessions: Vec<&Session> = details.iter().map(|d| &d.session).collect();

        let minutes = total_minutes(sessions.iter().copied());
        let avg_length = mean(sessions.iter().filter_map(|s| s.actual_minutes).map(f64::from))
            .unwrap_or(0.0);
        let totals = PeriodTotals {
            sessions: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
            minutes,
            hours: round1(f64::from(minutes) / 60.0),
            avg_focus: round1(average_focus(sessions.iter().copied())),
            avg_session_length: avg_length.round_ties_even(),
        };

        let categories = self
            .db
            .category_minutes_between(start_date, end_date, false)?
            .into_iter()
            .map(CategoryBreakdown::from)
            .collect();

        Ok(AnalyticsStats {
            period: days.to_string(),
            start_date,
            end_date,
            totals,
            daily: daily_series(&sessions, start_date, end_date),
            categories,
        })
    }

    fn sessions_in_last(&self, days: i64, now: DateTime<Utc>) -> Result<Vec<SessionDetail>> {
        let (first, last) = period_range(days, now.date_naive());
        self.db.session_details_between(first, last)
    }

    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn insights(&self, days: i64, now: DateTime<Utc>) -> Result<Insights> {
        let details = self.sessions_in_last(days, now)?;
        let sessions: Vec<&Session> = details.iter().map(|d| &d.session).collect();
        Ok(Insights {
            total_sessions: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
            total_hours: f64::from(total_minutes(sessions.iter().copied())) / 60.0,
            avg_focus_rating: average_focus(sessions.iter().copied()),
            most_productive_hour: most_productive_hour(&sessions),
            best_focus_day: best_focus_day(&sessions),
            completion_rate: completion_rate(&sessions),
        })
    }

    /// Monday-based week summary; defaults to the week containing `today`
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn weekly_summary(
        &self,
        week_start: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<WeeklySummary> {
        let week_start = week_start.unwrap_or_else(|| week_start_of(today));
        let week_end = week_start + Duration::days(6);
        let details = self.db.session_details_between(week_start, week_end)?;
        let sessions: Vec<&Session> = details.iter().map(|d| &d.session).collect();
        Ok(WeeklySummary {
            week_start,
            week_end,
            total_sessions: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
            total_minutes: total_minutes(sessions.iter().copied()),
            avg_focus: average_focus(sessions.iter().copied()),
            completion_rate: completion_rate(&sessions),
            daily_breakdown: daily_series(&sessions, week_start, week_end),
        })
    }

    /// Session length learned from focused, completed sessions
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn suggest_session_length(&self, task: Option<&Task>) -> Result<u32> {
        let minutes = self.db.focused_session_minutes(
            task.map(|t| t.category_id),
            task.map(|t| energy_band(t.energy_level)),
        )?;
        Ok(suggested_length(&minutes)
            .unwrap_or_else(|| default_session_length(task.map(|t| t.energy_level))))
    }

    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn distraction_patterns(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<DistractionCount>> {
        let details = self.sessions_in_last(days, now)?;
        let notes: Vec<&str> = details
            .iter()
            .map(|d| d.session.distractions.as_str())
            .filter(|n| !n.trim().is_empty())
            .collect();
        Ok(count_distractions(&notes))
    }

    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn energy_patterns(&self, days: i64, now: DateTime<Utc>) -> Result<EnergyPatterns> {
        let details = self.sessions_in_last(days, now)?;
        let sessions: Vec<&Session> = details.iter().map(|d| &d.session).collect();
        Ok(energy_by_hour(&sessions))
    }

    /// Up to three suggestions based on the last two weeks
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn productivity_tips(&self, now: DateTime<Utc>) -> Result<Vec<Tip>> {
        let insights = self.insights(14, now)?;
        let preferences = self.db.get_preferences()?;
        let active_goals = self.db.list_goals(Some(GoalStatus::Active))?.len();

        let mut tips = Vec::new();
        if insights.avg_focus_rating < 3.0 {
            tips.push(Tip {
                kind: "focus",
                title: "Improve Your Focus",
                message: "Your average focus rating is below 3. Try eliminating distractions before starting sessions.",
                action: "Turn off notifications and find a quiet workspace.",
            });
        }
        if insights.total_sessions < 20 {
            tips.push(Tip {
                kind: "frequency",
                title: "Increase Session Frequency",
                message: "You could benefit from more regular timeboxing sessions.",
                action: "Try to complete at least 2-3 focused sessions per day.",
            });
        }
        if !preferences.break_reminders {
            tips.push(Tip {
                kind: "breaks",
                title: "Enable Break Reminders",
                message: "Regular breaks can improve your overall productivity.",
                action: "Enable break reminders in your preferences.",
            });
        }
        if active_goals == 0 {
            tips.push(Tip {
                kind: "goals",
                title: "Set Some Goals",
                message: "Having clear goals can increase motivation and focus.",
                action: "Create 1-2 specific, measurable goals for this week.",
            });
        }
        tips.truncate(3);
        Ok(tips)
    }

    /// Consecutive days with sessions, ending today
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub fn session_streak(&self, today: NaiveDate) -> Result<u32> {
        Ok(crate::habits::session_streak(&self.db.session_dates()?, today))
    }
}
