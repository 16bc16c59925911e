use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use crate::models::{Habit, HabitLog};
use crate::validation::validate_habit;

use super::helpers::{fmt_date, fmt_datetime, parse_choice, parse_date, parse_datetime, to_u32};
use super::{Database, NotFound};

const HABIT_COLUMNS: &str =
    "id, name, description, category_id, frequency, target_per_period, is_active, created_at";

impl Database {
    // ==================== Habit Methods ====================

    /// Insert a habit and return its id
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound` for an unknown category, or a database error
    pub fn create_habit(&self, habit: &Habit) -> Result<i64> {
        validate_habit(habit)?;
        if self.get_category(habit.category_id)?.is_none() {
            return Err(NotFound::new("Category", habit.category_id).into());
        }
        self.conn.execute(
            "INSERT INTO habits (name, description, category_id, frequency, target_per_period, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                habit.name.trim(),
                habit.description,
                habit.category_id,
                habit.frequency.as_str(),
                habit.target_per_period,
                i32::from(habit.is_active),
                fmt_datetime(Utc::now()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Created habit {id}: {}", habit.name);
        Ok(id)
    }

    /// Get a habit by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_habit(&self, id: i64) -> Result<Option<Habit>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
                params![id],
                Self::row_to_habit,
            )
            .optional()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn find_habit_by_name(&self, name: &str) -> Result<Option<Habit>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE name = ?1 ORDER BY id LIMIT 1"),
                params![name],
                Self::row_to_habit,
            )
            .optional()?;
        Ok(result)
    }

    /// Habits ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn list_habits(&self, active_only: bool) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE ?1 = 0 OR is_active = 1 ORDER BY name"
        ))?;
        let habits = stmt
            .query_map(params![i32::from(active_only)], Self::row_to_habit)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound`, or a database error
    pub fn update_habit(&self, habit: &Habit) -> Result<()> {
        validate_habit(habit)?;
        let updated = self.conn.execute(
            "UPDATE habits SET name = ?1, description = ?2, category_id = ?3, frequency = ?4,
                    target_per_period = ?5, is_active = ?6
             WHERE id = ?7",
            params![
                habit.name.trim(),
                habit.description,
                habit.category_id,
                habit.frequency.as_str(),
                habit.target_per_period,
                i32::from(habit.is_active),
                habit.id,
            ],
        )?;
        if updated == 0 {
            return Err(NotFound::new("Habit", habit.id).into());
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, or a database error
    pub fn delete_habit(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(NotFound::new("Habit", id).into());
        }
        Ok(())
    }

    // ==================== Habit Log Methods ====================

    /// Record a habit for a date; logging the same date again overwrites it
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown habit, or a database error
    pub fn log_habit(
        &self,
        habit_id: i64,
        date: NaiveDate,
        completed: bool,
        notes: &str,
    ) -> Result<HabitLog> {
        if self.get_habit(habit_id)?.is_none() {
            return Err(NotFound::new("Habit", habit_id).into());
        }
        self.conn.execute(
            "INSERT INTO habit_logs (habit_id, date, completed, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(habit_id, date) DO UPDATE SET
                completed = excluded.completed,
                notes = excluded.notes",
            params![
                habit_id,
                fmt_date(date),
                i32::from(completed),
                notes,
                fmt_datetime(Utc::now()),
            ],
        )?;

        let log = self.conn.query_row(
            "SELECT id, habit_id, date, completed, notes, created_at
             FROM habit_logs WHERE habit_id = ?1 AND date = ?2",
            params![habit_id, fmt_date(date)],
            Self::row_to_habit_log,
        )?;
        Ok(log)
    }

    /// All logs of a habit, oldest date first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn habit_logs(&self, habit_id: i64) -> Result<Vec<HabitLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, date, completed, notes, created_at
             FROM habit_logs WHERE habit_id = ?1 ORDER BY date",
        )?;
        let logs = stmt
            .query_map(params![habit_id], Self::row_to_habit_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn row_to_habit(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
        Ok(Habit {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category_id: row.get(3)?,
            frequency: parse_choice(&row.get::<_, String>(4)?)?,
            target_per_period: to_u32(row.get(5)?)?,
            is_active: row.get::<_, i32>(6)? != 0,
            created_at: parse_datetime(&row.get::<_, String>(7)?)?,
        })
    }

    fn row_to_habit_log(row: &rusqlite::Row) -> rusqlite::Result<HabitLog> {
        Ok(HabitLog {
            id: row.get(0)?,
            habit_id: row.get(1)?,
            date: parse_date(&row.get::<_, String>(2)?)?,
            completed: row.get::<_, i32>(3)? != 0,
            notes: row.get(4)?,
            created_at: parse_datetime(&row.get::<_, String>(5)?)?,
        })
    }
}
