//! Daily reflections and weekly reviews.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use timebox_storage::{Database, GoalStatus, Reflection, WeeklyReview, WeeklyReviewText};

use crate::analytics::{round1, week_start_of, Analytics, DayStats};
use crate::goals::current_period_progress;

/// The reflection for a date with that day's activity
#[derive(Debug, Clone, Serialize)]
pub struct ReflectionDay {
    pub reflection: Reflection,
    /// False while the reflection is an unsaved draft
    pub saved: bool,
    pub day_stats: DayStats,
}

/// Saved reflection for `date`, or a fresh draft when none exists yet
///
/// # Errors
///
/// Returns an error if a database query fails
pub fn reflection_for(db: &Database, date: NaiveDate) -> Result<ReflectionDay> {
    let reflection = db
        .reflection_for_date(date)?
        .unwrap_or_else(|| Reflection::draft(date));
    Ok(ReflectionDay {
        saved: reflection.is_saved(),
        reflection,
        day_stats: Analytics::new(db).day_stats(date)?,
    })
}

/// Validate and store a reflection, replacing any earlier one for the same date
///
/// # Errors
///
/// Returns `ValidationError` or a database error
pub fn save_reflection(db: &Database, reflection: &Reflection) -> Result<Reflection> {
    let saved = db.save_reflection(reflection)?;
    log::info!("Saved daily reflection for {}", saved.date);
    Ok(saved)
}

/// Snapshot the week's numbers, attach the user's notes and store the review
///
/// `week_start` is moved back to its Monday.
///
/// # Errors
///
/// Returns `ValidationError` when required notes are empty, or a database error
pub fn build_weekly_review(
    db: &Database,
    week_start: NaiveDate,
    text: &WeeklyReviewText,
) -> Result<WeeklyReview> {
    let week_start = week_start_of(week_start);
    let week_end = week_start + Duration::days(6);
    let totals = db.session_totals(week_start, week_end)?;

    let active_goals = db.list_goals(Some(GoalStatus::Active))?;
    let mut goals_achieved = 0;
    for goal in &active_goals {
        if current_period_progress(db, goal, week_end)?.progress >= 100.0 {
            goals_achieved += 1;
        }
    }

    let review = WeeklyReview {
        id: 0,
        week_start_date: week_start,
        total_sessions: totals.sessions,
        total_minutes: totals.minutes,
        average_focus_rating: totals.avg_focus.map(round1),
        goals_achieved,
        goals_total: u32::try_from(active_goals.len()).unwrap_or(u32::MAX),
        biggest_wins: text.biggest_wins.clone(),
        main_challenges: text.main_challenges.clone(),
        lessons_learned: text.lessons_learned.clone(),
        next_week_focus: text.next_week_focus.clone(),
        process_improvements: text.process_improvements.clone(),
        created_at: Utc::now(),
    };
    let saved = db.save_weekly_review(&review)?;
    log::info!(
        "Saved weekly review for {week_start}: {} sessions, {goals_achieved}/{} goals",
        saved.total_sessions,
        saved.goals_total
    );
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use timebox_storage::{Goal, GoalPeriod, Session, SessionOutcome, Task, ValidationError};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text() -> WeeklyReviewText {
        WeeklyReviewText {
            biggest_wins: "Shipped the report".into(),
            main_challenges: "Meetings".into(),
            lessons_learned: "Block mornings".into(),
            next_week_focus: "Planning".into(),
            process_improvements: String::new(),
        }
    }

    #[test]
    fn test_reflection_draft_then_saved() {
        let db = Database::open_in_memory().unwrap();
        let day = date(2024, 3, 10);

        let first = reflection_for(&db, day).unwrap();
        assert!(!first.saved);
        assert_eq!(first.reflection.overall_productivity, 3);

        let mut reflection = first.reflection;
        reflection.wins = "Finished slides".into();
        reflection.challenges = "Slept badly".into();
        reflection.improvements = "Earlier night".into();
        reflection.tomorrow_focus = "Review PRs".into();
        save_reflection(&db, &reflection).unwrap();

        let second = reflection_for(&db, day).unwrap();
        assert!(second.saved);
        assert_eq!(second.reflection.wins, "Finished slides");
    }

    #[test]
    fn test_weekly_review_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let category = db.find_category_by_name("Work & Career").unwrap().unwrap().id;
        let task = db.create_task(&Task::new("Write report", category)).unwrap();

        let mut weekly = Goal::new("Two hours of work", category, 1.0);
        weekly.period = GoalPeriod::Weekly;
        db.create_goal(&weekly).unwrap();
        db.create_goal(&Goal::new("Big push", category, 40.0)).unwrap();

        for (day, focus) in [(5, 4), (6, 5)] {
            let start = at(2024, 3, day, 9);
            let mut session = Session::new(task, start, 25);
            session.end_time = Some(start + Duration::minutes(45));
            session.actual_minutes = Some(45);
            session.focus_rating = Some(focus);
            session.outcome = Some(SessionOutcome::Completed);
            db.create_session(&session).unwrap();
        }

        // mid-week date snaps to Monday 2024-03-04
        let review = build_weekly_review(&db, date(2024, 3, 7), &text()).unwrap();
        assert_eq!(review.week_start_date, date(2024, 3, 4));
        assert_eq!(review.total_sessions, 2);
        assert_eq!(review.total_minutes, 90);
        assert_eq!(review.average_focus_rating, Some(4.5));
        assert_eq!(review.goals_total, 2);
        assert_eq!(review.goals_achieved, 1);
    }

    #[test]
    fn test_weekly_review_requires_notes() {
        let db = Database::open_in_memory().unwrap();
        let mut empty = text();
        empty.lessons_learned.clear();
        let err = build_weekly_review(&db, date(2024, 3, 4), &empty).unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
    }
}
