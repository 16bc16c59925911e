use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::models::Category;
use crate::validation::{validate_category, ValidationError};

use super::helpers::{day_bounds, fmt_datetime, parse_choice, parse_datetime, sum_to_u32, to_u32};
use super::{Database, NotFound};

/// Minutes and session count spent in one category over a range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMinutes {
    pub category_id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub minutes: u32,
    pub sessions: u32,
}

const CATEGORY_COLUMNS: &str =
    "id, name, category_type, description, color, icon, is_active, created_at, updated_at";

impl Database {
    /// Insert a category and return its id
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for bad fields or a duplicate name, or a database error
    pub fn create_category(&self, category: &Category) -> Result<i64> {
        validate_category(category)?;
        self.ensure_unique_category_name(&category.name, None)?;

        let now = fmt_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO categories (name, category_type, description, color, icon, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                category.name.trim(),
                category.category_type.as_str(),
                category.description,
                category.color,
                category.icon,
                i32::from(category.is_active),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Created category {id}: {}", category.name);
        Ok(id)
    }

    /// Get a category by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
                params![id],
                Self::row_to_category,
            )
            .optional()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1 COLLATE NOCASE"),
                params![name.trim()],
                Self::row_to_category,
            )
            .optional()?;
        Ok(result)
    }

    /// List categories ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        let sql = if active_only {
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active = 1 ORDER BY name")
        } else {
            format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Update every editable field of a category
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound` when the id is unknown, or a database error
    pub fn update_category(&self, category: &Category) -> Result<()> {
        validate_category(category)?;
        self.ensure_unique_category_name(&category.name, Some(category.id))?;

        let updated = self.conn.execute(
            "UPDATE categories SET name = ?1, category_type = ?2, description = ?3, color = ?4,
                    icon = ?5, is_active = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                category.name.trim(),
                category.category_type.as_str(),
                category.description,
                category.color,
                category.icon,
                i32::from(category.is_active),
                fmt_datetime(Utc::now()),
                category.id,
            ],
        )?;
        if updated == 0 {
            return Err(NotFound::new("Category", category.id).into());
        }
        Ok(())
    }

    /// Delete a category; its tasks, goals and habits cascade
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, or a database error
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(NotFound::new("Category", id).into());
        }
        log::info!("Deleted category {id}");
        Ok(())
    }

    /// Number of tasks filed under a category
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn count_tasks_in_category(&self, id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE category_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn ensure_unique_category_name(&self, name: &str, exclude_id: Option<i64>) -> Result<()> {
        let clash: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1 COLLATE NOCASE AND id != ?2",
                params![name.trim(), exclude_id.unwrap_or(0)],
                |row| row.get(0),
            )
            .optional()?;
        if clash.is_some() {
            return Err(ValidationError::DuplicateCategory {
                name: name.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    // ==================== Category Aggregates ====================

    /// Minutes logged against a category's tasks by sessions started on `date`
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn category_minutes_on(&self, category_id: i64, date: NaiveDate) -> Result<u32> {
        let (start, end) = day_bounds(date, date);
        let minutes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(s.actual_minutes), 0)
             FROM sessions s JOIN tasks t ON t.id = s.task_id
             WHERE t.category_id = ?1 AND s.start_time >= ?2 AND s.start_time < ?3",
            params![category_id, start, end],
            |row| row.get(0),
        )?;
        Ok(sum_to_u32(minutes))
    }

    /// Sessions started on `date` against a category's tasks
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn category_session_count_on(&self, category_id: i64, date: NaiveDate) -> Result<u32> {
        let (start, end) = day_bounds(date, date);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM sessions s JOIN tasks t ON t.id = s.task_id
             WHERE t.category_id = ?1 AND s.start_time >= ?2 AND s.start_time < ?3",
            params![category_id, start, end],
            |row| row.get(0),
        )?;
        Ok(to_u32(count)?)
    }

    /// Per-category minutes and session counts for sessions started in `[first, last]`,
    /// ordered by minutes descending. Categories without sessions are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn category_minutes_between(
        &self,
        first: NaiveDate,
        last: NaiveDate,
        active_only: bool,
    ) -> Result<Vec<CategoryMinutes>> {
        let (start, end) = day_bounds(first, last);
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.color, c.icon,
                    COALESCE(SUM(s.actual_minutes), 0) AS minutes, COUNT(s.id)
             FROM categories c
             JOIN tasks t ON t.category_id = c.id
             JOIN sessions s ON s.task_id = t.id
             WHERE s.start_time >= ?1 AND s.start_time < ?2 AND (?3 = 0 OR c.is_active = 1)
             GROUP BY c.id
             ORDER BY minutes DESC, c.name",
        )?;
        let rows = stmt
            .query_map(params![start, end, i32::from(active_only)], |row| {
                Ok(CategoryMinutes {
                    category_id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    icon: row.get(3)?,
                    minutes: sum_to_u32(row.get(4)?),
                    sessions: to_u32(row.get(5)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Helper function to parse `Category` from database row
    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            category_type: parse_choice(&row.get::<_, String>(2)?)?,
            description: row.get(3)?,
            color: row.get(4)?,
            icon: row.get(5)?,
            is_active: row.get::<_, i32>(6)? != 0,
            created_at: parse_datetime(&row.get::<_, String>(7)?)?,
            updated_at: parse_datetime(&row.get::<_, String>(8)?)?,
        })
    }
}
