//! Demo data for trying the tool out.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use timebox_storage::{
    Database, EnergyLevel, Goal, Habit, HabitFrequency, Priority, Reflection, Session,
    SessionOutcome, Task,
};

const SAMPLE_GOAL: &str = "Deep work every week";
const SAMPLE_HABIT: &str = "Morning planning";

/// (title, priority, energy, estimated minutes, due in hours; negative is overdue)
const SAMPLE_TASKS: &[(&str, Priority, EnergyLevel, u32, Option<i64>)] = &[
    ("Draft quarterly report", Priority::High, EnergyLevel::High, 90, Some(48)),
    ("Review pull requests", Priority::Medium, EnergyLevel::Medium, 45, Some(-6)),
    ("Renew gym membership", Priority::Low, EnergyLevel::Low, 15, Some(-30)),
    ("Read Rust book chapter", Priority::Medium, EnergyLevel::Medium, 60, None),
    ("Plan weekend trip", Priority::Low, EnergyLevel::Low, 30, Some(120)),
];

/// What one run of `create_sample_data` added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleReport {
    pub goals: u32,
    pub tasks: u32,
    pub sessions: u32,
    pub habits: u32,
    pub habit_logs: u32,
    pub reflections: u32,
}

impl SampleReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.goals + self.tasks + self.sessions + self.habits + self.habit_logs + self.reflections
            == 0
    }
}

/// Seed a goal, tasks, a week of sessions, a habit and a reflection
///
/// Anything already present by title or name is left alone, so running it twice adds nothing.
///
/// # Errors
///
/// Returns an error if a database write fails
pub fn create_sample_data(db: &Database, now: DateTime<Utc>) -> Result<SampleReport> {
    db.ensure_default_categories()?;
    db.get_preferences()?;
    let work = db
        .find_category_by_name("Work & Career")?
        .or(db.list_categories(true)?.into_iter().next())
        .context("No category available for sample data")?;

    let mut report = SampleReport::default();
    let today = now.date_naive();

    let goal_id = match db.find_goal_by_title(SAMPLE_GOAL)? {
        Some(goal) => goal.id,
        None => {
            let mut goal = Goal::new(SAMPLE_GOAL, work.id, 10.0);
            goal.description = "Ten focused hours on work projects".to_string();
            goal.start_date = today - Duration::days(14);
            report.goals += 1;
            db.create_goal(&goal)?
        }
    };

    for (index, &(title, priority, energy, estimated, due_hours)) in SAMPLE_TASKS.iter().enumerate()
    {
        if db.find_task_by_title(title)?.is_some() {
            continue;
        }
        let mut task = Task::new(title, work.id);
        task.goal_id = Some(goal_id);
        task.priority = priority;
        task.energy_level = energy;
        task.estimated_minutes = estimated;
        task.due_date = due_hours.map(|h| now + Duration::hours(h));
        let task_id = db.create_task(&task)?;
        report.tasks += 1;

        // one finished session per day, spread over the past week
        for day in (1..=7_i64).filter(|d| (d + i64::try_from(index).unwrap_or(0)) % 3 != 0) {
            let start = now - Duration::days(day) - Duration::hours(2);
            let minutes = [25_u32, 45, 50, 30][usize::try_from(day).unwrap_or(0) % 4];
            let mut session = Session::new(task_id, start, 25);
            session.end_time = Some(start + Duration::minutes(i64::from(minutes)));
            session.actual_minutes = Some(minutes);
            session.outcome = Some(if day % 5 == 0 {
                SessionOutcome::Partial
            } else {
                SessionOutcome::Completed
            });
            session.focus_rating = Some(u8::try_from(3 + day % 3).unwrap_or(3));
            session.energy_before = Some(u8::try_from(2 + day % 4).unwrap_or(3));
            session.energy_after = Some(3);
            if day % 4 == 0 {
                session.distractions = "Phone notification and an email".to_string();
            }
            db.create_session(&session)?;
            report.sessions += 1;
        }
    }

    if db.find_habit_by_name(SAMPLE_HABIT)?.is_none() {
        let mut habit = Habit::new(SAMPLE_HABIT, work.id, HabitFrequency::Daily);
        habit.description = "Write the day's three priorities".to_string();
        let habit_id = db.create_habit(&habit)?;
        report.habits += 1;
        for day in 0..5 {
            db.log_habit(habit_id, today - Duration::days(day), true, "")?;
            report.habit_logs += 1;
        }
    }

    let yesterday = today - Duration::days(1);
    if db.reflection_for_date(yesterday)?.is_none() {
        let mut reflection = Reflection::draft(yesterday);
        reflection.overall_productivity = 4;
        reflection.energy_level = 4;
        reflection.mood = 4;
        reflection.stress_level = 2;
        reflection.wins = "Finished the report outline".to_string();
        reflection.challenges = "Too many meetings after lunch".to_string();
        reflection.improvements = "Block the afternoon for focus".to_string();
        reflection.tomorrow_focus = "Review pull requests".to_string();
        db.save_reflection(&reflection)?;
        report.reflections += 1;
    }

    log::info!(
        "Sample data: {} goals, {} tasks, {} sessions, {} habits, {} reflections added",
        report.goals,
        report.tasks,
        report.sessions,
        report.habits,
        report.reflections
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_data_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        let first = create_sample_data(&db, now).unwrap();
        assert_eq!(first.goals, 1);
        assert_eq!(first.tasks, 5);
        assert!(first.sessions > 0);
        assert_eq!(first.habit_logs, 5);
        assert_eq!(first.reflections, 1);

        let second = create_sample_data(&db, now).unwrap();
        assert!(second.is_empty());
        assert_eq!(db.all_tasks().unwrap().len(), 5);
    }

    #[test]
    fn test_sample_data_includes_overdue_tasks() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        create_sample_data(&db, now).unwrap();
        assert_eq!(db.overdue_tasks(now).unwrap().len(), 2);

        let today = now.date_naive();
        let week = db.session_totals(today - Duration::days(7), today).unwrap();
        assert_eq!(week.sessions as usize, db.all_session_details().unwrap().len());
    }
}
