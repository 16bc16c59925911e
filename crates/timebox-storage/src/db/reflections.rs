use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use crate::models::{Reflection, WeeklyReview};
use crate::validation::{validate_reflection, validate_weekly_review};

use super::helpers::{fmt_date, fmt_datetime, parse_date, parse_datetime, to_u32, to_u8};
use super::Database;

const REFLECTION_COLUMNS: &str = "id, date, overall_productivity, energy_level, mood, stress_level,
    wins, challenges, improvements, tomorrow_focus, gratitude, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, week_start_date, total_sessions, total_minutes,
    average_focus_rating, goals_achieved, goals_total, biggest_wins, main_challenges,
    lessons_learned, next_week_focus, process_improvements, created_at";

impl Database {
    // ==================== Reflection Methods ====================

    /// Saved reflection for a date, if one exists
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn reflection_for_date(&self, date: NaiveDate) -> Result<Option<Reflection>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {REFLECTION_COLUMNS} FROM reflections WHERE date = ?1"),
                params![fmt_date(date)],
                Self::row_to_reflection,
            )
            .optional()?;
        Ok(result)
    }

    /// Insert or replace the reflection for its date, returning the stored row
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` or a database error
    pub fn save_reflection(&self, reflection: &Reflection) -> Result<Reflection> {
        validate_reflection(reflection)?;
        let now = fmt_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO reflections (date, overall_productivity, energy_level, mood, stress_level,
                                      wins, challenges, improvements, tomorrow_focus, gratitude,
                                      created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             ON CONFLICT(date) DO UPDATE SET
                overall_productivity = excluded.overall_productivity,
                energy_level = excluded.energy_level,
                mood = excluded.mood,
                stress_level = excluded.stress_level,
                wins = excluded.wins,
                challenges = excluded.challenges,
                improvements = excluded.improvements,
                tomorrow_focus = excluded.tomorrow_focus,
                gratitude = excluded.gratitude,
                updated_at = excluded.updated_at",
            params![
                fmt_date(reflection.date),
                reflection.overall_productivity,
                reflection.energy_level,
                reflection.mood,
                reflection.stress_level,
                reflection.wins,
                reflection.challenges,
                reflection.improvements,
                reflection.tomorrow_focus,
                reflection.gratitude,
                now,
            ],
        )?;

        self.reflection_for_date(reflection.date)?
            .ok_or_else(|| anyhow::anyhow!("Reflection for {} vanished after save", reflection.date))
    }

    /// All reflections, newest date first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn list_reflections(&self) -> Result<Vec<Reflection>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REFLECTION_COLUMNS} FROM reflections ORDER BY date DESC"
        ))?;
        let reflections = stmt
            .query_map([], Self::row_to_reflection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reflections)
    }

    // ==================== Weekly Review Methods ====================

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn weekly_review(&self, week_start: NaiveDate) -> Result<Option<WeeklyReview>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM weekly_reviews WHERE week_start_date = ?1"),
                params![fmt_date(week_start)],
                Self::row_to_weekly_review,
            )
            .optional()?;
        Ok(result)
    }

    /// Insert or replace the review for its week, returning the stored row
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` or a database error
    pub fn save_weekly_review(&self, review: &WeeklyReview) -> Result<WeeklyReview> {
        validate_weekly_review(review)?;
        self.conn.execute(
            "INSERT INTO weekly_reviews (week_start_date, total_sessions, total_minutes,
                                         average_focus_rating, goals_achieved, goals_total,
                                         biggest_wins, main_challenges, lessons_learned,
                                         next_week_focus, process_improvements, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(week_start_date) DO UPDATE SET
                total_sessions = excluded.total_sessions,
                total_minutes = excluded.total_minutes,
                average_focus_rating = excluded.average_focus_rating,
                goals_achieved = excluded.goals_achieved,
                goals_total = excluded.goals_total,
                biggest_wins = excluded.biggest_wins,
                main_challenges = excluded.main_challenges,
                lessons_learned = excluded.lessons_learned,
                next_week_focus = excluded.next_week_focus,
                process_improvements = excluded.process_improvements",
            params![
                fmt_date(review.week_start_date),
                review.total_sessions,
                review.total_minutes,
                review.average_focus_rating,
                review.goals_achieved,
                review.goals_total,
                review.biggest_wins,
                review.main_challenges,
                review.lessons_learned,
                review.next_week_focus,
                review.process_improvements,
                fmt_datetime(Utc::now()),
            ],
        )?;

        self.weekly_review(review.week_start_date)?.ok_or_else(|| {
            anyhow::anyhow!("Weekly review for {} vanished after save", review.week_start_date)
        })
    }

    /// All weekly reviews, newest week first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn list_weekly_reviews(&self) -> Result<Vec<WeeklyReview>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM weekly_reviews ORDER BY week_start_date DESC"
        ))?;
        let reviews = stmt
            .query_map([], Self::row_to_weekly_review)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    fn row_to_reflection(row: &rusqlite::Row) -> rusqlite::Result<Reflection> {
        Ok(Reflection {
            id: row.get(0)?,
            date: parse_date(&row.get::<_, String>(1)?)?,
            overall_productivity: to_u8(row.get(2)?)?,
            energy_level: to_u8(row.get(3)?)?,
            mood: to_u8(row.get(4)?)?,
            stress_level: to_u8(row.get(5)?)?,
            wins: row.get(6)?,
            challenges: row.get(7)?,
            improvements: row.get(8)?,
            tomorrow_focus: row.get(9)?,
            gratitude: row.get(10)?,
            created_at: parse_datetime(&row.get::<_, String>(11)?)?,
            updated_at: parse_datetime(&row.get::<_, String>(12)?)?,
        })
    }

    fn row_to_weekly_review(row: &rusqlite::Row) -> rusqlite::Result<WeeklyReview> {
        Ok(WeeklyReview {
            id: row.get(0)?,
            week_start_date: parse_date(&row.get::<_, String>(1)?)?,
            total_sessions: to_u32(row.get(2)?)?,
            total_minutes: to_u32(row.get(3)?)?,
            average_focus_rating: row.get(4)?,
            goals_achieved: to_u32(row.get(5)?)?,
            goals_total: to_u32(row.get(6)?)?,
            biggest_wins: row.get(7)?,
            main_challenges: row.get(8)?,
            lessons_learned: row.get(9)?,
            next_week_focus: row.get(10)?,
            process_improvements: row.get(11)?,
            created_at: parse_datetime(&row.get::<_, String>(12)?)?,
        })
    }
}
