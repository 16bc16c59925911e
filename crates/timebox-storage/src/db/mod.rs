//! Database operations split into domain-specific modules.
//!
//! This module re-exports the main Database struct and all its operations.

mod categories;
pub(crate) mod helpers;
mod goals;
mod habits;
mod preferences;
mod reflections;
mod sessions;
mod tasks;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

use crate::migrations;

pub use categories::CategoryMinutes;
pub use helpers::{fmt_date, fmt_datetime};
pub use sessions::{DayTotals, SessionDetail};
pub use tasks::{TaskCounts, TaskFilter, TaskPage, TaskQuery, TASK_PAGE_SIZE};

/// A lookup by id that matched no row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} {id} not found")]
pub struct NotFound {
    pub entity: &'static str,
    pub id: i64,
}

impl NotFound {
    #[must_use]
    pub const fn new(entity: &'static str, id: i64) -> Self {
        Self { entity, id }
    }
}

/// Database connection wrapper
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Errors
    ///
    /// Returns an error if database directory creation, connection opening, or schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        let db = Self::from_connection(conn)?;

        log::info!("Database initialized at: {}", path.display());
        Ok(db)
    }

    /// Fresh in-memory database with schema and default categories
    ///
    /// # Errors
    ///
    /// Returns an error if schema initialization fails
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::init_schema(&conn).context("Failed to initialize schema")?;
        migrations::insert_default_categories(&conn)?;
        Ok(Self { conn })
    }

    /// Get default database path
    #[must_use]
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("timebox");
        path.push("timebox.db");
        path
    }

    /// Seed default categories again (used by `init` and sample data)
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub fn ensure_default_categories(&self) -> Result<()> {
        migrations::insert_default_categories(&self.conn)
    }

    // ==================== App State Methods ====================

    /// Record a bookkeeping timestamp such as the last scheduler run
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub fn set_state_time(&self, key: &str, value: DateTime<Utc>) -> Result<()> {
        let now = fmt_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, fmt_datetime(value), now],
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is not a timestamp
    pub fn get_state_time(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.as_deref().map(helpers::parse_datetime).transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_backed_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("timebox.db");
        let db = Database::new(Some(path.clone())).unwrap();
        assert!(path.exists());
        assert_eq!(db.list_categories(false).unwrap().len(), 5);
    }

    #[test]
    fn test_state_time_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_state_time("last_overdue_run").unwrap(), None);
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        db.set_state_time("last_overdue_run", at).unwrap();
        db.set_state_time("last_overdue_run", at).unwrap();
        assert_eq!(db.get_state_time("last_overdue_run").unwrap(), Some(at));
    }
}
