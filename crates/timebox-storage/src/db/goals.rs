use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use crate::models::{Goal, GoalStatus};
use crate::validation::validate_goal;

use super::helpers::{
    day_bounds, fmt_date, fmt_datetime, parse_choice, parse_date, parse_datetime, parse_opt_date,
    sum_to_u32,
};
use super::{Database, NotFound};

const GOAL_COLUMNS: &str = "id, title, description, category_id, target_hours_per_period, period,
    status, start_date, end_date, created_at, updated_at";

impl Database {
    /// Insert a goal and return its id
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound` for an unknown category, or a database error
    pub fn create_goal(&self, goal: &Goal) -> Result<i64> {
        validate_goal(goal)?;
        if self.get_category(goal.category_id)?.is_none() {
            return Err(NotFound::new("Category", goal.category_id).into());
        }

        let now = fmt_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO goals (title, description, category_id, target_hours_per_period, period,
                                status, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                goal.title.trim(),
                goal.description,
                goal.category_id,
                round_hours(goal.target_hours_per_period),
                goal.period.as_str(),
                goal.status.as_str(),
                fmt_date(goal.start_date),
                goal.end_date.map(fmt_date),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Created goal {id}: {}", goal.title);
        Ok(id)
    }

    /// Get a goal by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
                params![id],
                Self::row_to_goal,
            )
            .optional()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn find_goal_by_title(&self, title: &str) -> Result<Option<Goal>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE title = ?1 ORDER BY id LIMIT 1"),
                params![title],
                Self::row_to_goal,
            )
            .optional()?;
        Ok(result)
    }

    /// Goals newest first, optionally only those with `status`
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn list_goals(&self, status: Option<GoalStatus>) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let goals = stmt
            .query_map(params![status.map(|s| s.as_str())], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Update every editable field of a goal
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound`, or a database error
    pub fn update_goal(&self, goal: &Goal) -> Result<()> {
        validate_goal(goal)?;
        if self.get_category(goal.category_id)?.is_none() {
            return Err(NotFound::new("Category", goal.category_id).into());
        }

        let updated = self.conn.execute(
            "UPDATE goals SET title = ?1, description = ?2, category_id = ?3,
                    target_hours_per_period = ?4, period = ?5, status = ?6, start_date = ?7,
                    end_date = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                goal.title.trim(),
                goal.description,
                goal.category_id,
                round_hours(goal.target_hours_per_period),
                goal.period.as_str(),
                goal.status.as_str(),
                fmt_date(goal.start_date),
                goal.end_date.map(fmt_date),
                fmt_datetime(Utc::now()),
                goal.id,
            ],
        )?;
        if updated == 0 {
            return Err(NotFound::new("Goal", goal.id).into());
        }
        Ok(())
    }

    /// Delete a goal; linked tasks keep living with their goal cleared
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, or a database error
    pub fn delete_goal(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(NotFound::new("Goal", id).into());
        }
        Ok(())
    }

    /// Minutes credited to a category by sessions started in `[first, last]`
    /// whose outcome was completed or partial
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn productive_minutes_for_category(
        &self,
        category_id: i64,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<u32> {
        let (start, end) = day_bounds(first, last);
        let minutes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(s.actual_minutes), 0)
             FROM sessions s JOIN tasks t ON t.id = s.task_id
             WHERE t.category_id = ?1
               AND s.start_time >= ?2 AND s.start_time < ?3
               AND s.outcome IN ('completed', 'partial')",
            params![category_id, start, end],
            |row| row.get(0),
        )?;
        Ok(sum_to_u32(minutes))
    }

    /// Helper function to parse `Goal` from database row
    fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
        Ok(Goal {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category_id: row.get(3)?,
            target_hours_per_period: row.get(4)?,
            period: parse_choice(&row.get::<_, String>(5)?)?,
            status: parse_choice(&row.get::<_, String>(6)?)?,
            start_date: parse_date(&row.get::<_, String>(7)?)?,
            end_date: parse_opt_date(row.get(8)?)?,
            created_at: parse_datetime(&row.get::<_, String>(9)?)?,
            updated_at: parse_datetime(&row.get::<_, String>(10)?)?,
        })
    }
}

fn round_hours(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}
