use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::models::Session;
use crate::validation::validate_session;

use super::helpers::{
    day_bounds, fmt_datetime, parse_datetime, parse_opt_datetime, sum_to_u32, to_u32, to_u8,
};
use super::{Database, NotFound};

const SESSION_COLUMNS: &str = "s.id, s.task_id, s.start_time, s.end_time, s.planned_minutes,
    s.actual_minutes, s.outcome, s.focus_rating, s.energy_before, s.energy_after, s.notes,
    s.distractions, s.key_insights, s.created_at, s.updated_at";

const DETAIL_JOIN: &str = "FROM sessions s
    JOIN tasks t ON t.id = s.task_id
    JOIN categories c ON c.id = t.category_id";

/// A session together with the task and category it was logged against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub task_title: String,
    pub category_id: i64,
    pub category_name: String,
}

/// Aggregate of the sessions started in a date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DayTotals {
    pub sessions: u32,
    pub minutes: u32,
    pub avg_focus: Option<f64>,
    pub avg_minutes: Option<f64>,
}

impl Database {
    /// Insert a session and return its id
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound` for an unknown task, or a database error
    pub fn create_session(&self, session: &Session) -> Result<i64> {
        validate_session(session)?;
        if self.get_task(session.task_id)?.is_none() {
            return Err(NotFound::new("Task", session.task_id).into());
        }

        let now = fmt_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO sessions (task_id, start_time, end_time, planned_minutes, actual_minutes,
                                   outcome, focus_rating, energy_before, energy_after, notes,
                                   distractions, key_insights, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                session.task_id,
                fmt_datetime(session.start_time),
                session.end_time.map(fmt_datetime),
                session.planned_minutes,
                session.actual_minutes,
                session.outcome.map(|o| o.as_str()),
                session.focus_rating,
                session.energy_before,
                session.energy_after,
                session.notes,
                session.distractions,
                session.key_insights,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("Created session {id} for task {}", session.task_id);
        Ok(id)
    }

    /// Get a session by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_session(&self, id: i64) -> Result<Option<Session>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.id = ?1"),
                params![id],
                Self::row_to_session,
            )
            .optional()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_session_detail(&self, id: i64) -> Result<Option<SessionDetail>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS}, t.title, c.id, c.name {DETAIL_JOIN} WHERE s.id = ?1"
                ),
                params![id],
                Self::row_to_session_detail,
            )
            .optional()?;
        Ok(result)
    }

    /// Persist every mutable field of a session
    ///
    /// # Errors
    ///
    /// Returns `ValidationError`, `NotFound`, or a database error
    pub fn update_session(&self, session: &Session) -> Result<()> {
        validate_session(session)?;
        let updated = self.conn.execute(
            "UPDATE sessions SET start_time = ?1, end_time = ?2, planned_minutes = ?3,
                    actual_minutes = ?4, outcome = ?5, focus_rating = ?6, energy_before = ?7,
                    energy_after = ?8, notes = ?9, distractions = ?10, key_insights = ?11,
                    updated_at = ?12
             WHERE id = ?13",
            params![
                fmt_datetime(session.start_time),
                session.end_time.map(fmt_datetime),
                session.planned_minutes,
                session.actual_minutes,
                session.outcome.map(|o| o.as_str()),
                session.focus_rating,
                session.energy_before,
                session.energy_after,
                session.notes,
                session.distractions,
                session.key_insights,
                fmt_datetime(Utc::now()),
                session.id,
            ],
        )?;
        if updated == 0 {
            return Err(NotFound::new("Session", session.id).into());
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown, or a database error
    pub fn delete_session(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(NotFound::new("Session", id).into());
        }
        Ok(())
    }

    /// The session still running, if any (most recent first)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn active_session(&self) -> Result<Option<Session>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions s
                     WHERE s.end_time IS NULL
                     ORDER BY s.start_time DESC LIMIT 1"
                ),
                [],
                Self::row_to_session,
            )
            .optional()?;
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn active_session_for_task(&self, task_id: i64) -> Result<Option<Session>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions s
                     WHERE s.task_id = ?1 AND s.end_time IS NULL
                     ORDER BY s.start_time DESC LIMIT 1"
                ),
                params![task_id],
                Self::row_to_session,
            )
            .optional()?;
        Ok(result)
    }

    /// Sessions of one task, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn sessions_for_task(&self, task_id: i64) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.task_id = ?1 ORDER BY s.start_time DESC"
        ))?;
        let sessions = stmt
            .query_map(params![task_id], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Sum of minutes recorded by a task's finished sessions
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn logged_minutes_for_task(&self, task_id: i64) -> Result<u32> {
        let minutes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(actual_minutes), 0) FROM sessions WHERE task_id = ?1",
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(sum_to_u32(minutes))
    }

    /// Sessions started in `[first, last]` with task and category, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn session_details_between(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<SessionDetail>> {
        let (start, end) = day_bounds(first, last);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS}, t.title, c.id, c.name {DETAIL_JOIN}
             WHERE s.start_time >= ?1 AND s.start_time < ?2
             ORDER BY s.start_time DESC"
        ))?;
        let sessions = stmt
            .query_map(params![start, end], Self::row_to_session_detail)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Most recent sessions with task and category
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS}, t.title, c.id, c.name {DETAIL_JOIN}
             ORDER BY s.start_time DESC LIMIT ?1"
        ))?;
        let sessions = stmt
            .query_map(params![limit], Self::row_to_session_detail)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Every session with task and category, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn all_session_details(&self) -> Result<Vec<SessionDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS}, t.title, c.id, c.name {DETAIL_JOIN}
             ORDER BY s.start_time DESC"
        ))?;
        let sessions = stmt
            .query_map([], Self::row_to_session_detail)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Count, minutes, average focus and average length of sessions started in `[first, last]`
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn session_totals(&self, first: NaiveDate, last: NaiveDate) -> Result<DayTotals> {
        let (start, end) = day_bounds(first, last);
        let (sessions, minutes, avg_focus, avg_minutes): (i64, i64, Option<f64>, Option<f64>) =
            self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(actual_minutes), 0), AVG(focus_rating), AVG(actual_minutes)
                 FROM sessions WHERE start_time >= ?1 AND start_time < ?2",
                params![start, end],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        Ok(DayTotals {
            sessions: to_u32(sessions)?,
            minutes: sum_to_u32(minutes),
            avg_focus,
            avg_minutes,
        })
    }

    /// Distinct calendar dates that have at least one session, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn session_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(start_time, 1, 10) AS day FROM sessions ORDER BY day DESC",
        )?;
        let dates = stmt
            .query_map([], |row| super::helpers::parse_date(&row.get::<_, String>(0)?))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(dates)
    }

    /// Lengths of completed sessions rated 4 or higher, optionally narrowed to a
    /// category and a band of energy-before ratings
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn focused_session_minutes(
        &self,
        category_id: Option<i64>,
        energy_band: Option<(u8, u8)>,
    ) -> Result<Vec<u32>> {
        let (low, high) = energy_band.map_or((None, None), |(lo, hi)| (Some(lo), Some(hi)));
        let mut stmt = self.conn.prepare(
            "SELECT s.actual_minutes
             FROM sessions s JOIN tasks t ON t.id = s.task_id
             WHERE s.outcome = 'completed' AND s.focus_rating >= 4 AND s.actual_minutes IS NOT NULL
               AND (?1 IS NULL OR t.category_id = ?1)
               AND (?2 IS NULL OR s.energy_before BETWEEN ?2 AND ?3)",
        )?;
        let minutes = stmt
            .query_map(params![category_id, low, high], |row| to_u32(row.get(0)?))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(minutes)
    }

    /// Helper function to parse `Session` from database row
    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let outcome: Option<String> = row.get(6)?;
        Ok(Session {
            id: row.get(0)?,
            task_id: row.get(1)?,
            start_time: parse_datetime(&row.get::<_, String>(2)?)?,
            end_time: parse_opt_datetime(row.get(3)?)?,
            planned_minutes: to_u32(row.get(4)?)?,
            actual_minutes: row.get::<_, Option<i64>>(5)?.map(to_u32).transpose()?,
            outcome: outcome
                .as_deref()
                .map(super::helpers::parse_choice)
                .transpose()?,
            focus_rating: row.get::<_, Option<i64>>(7)?.map(to_u8).transpose()?,
            energy_before: row.get::<_, Option<i64>>(8)?.map(to_u8).transpose()?,
            energy_after: row.get::<_, Option<i64>>(9)?.map(to_u8).transpose()?,
            notes: row.get(10)?,
            distractions: row.get(11)?,
            key_insights: row.get(12)?,
            created_at: parse_datetime(&row.get::<_, String>(13)?)?,
            updated_at: parse_datetime(&row.get::<_, String>(14)?)?,
        })
    }

    fn row_to_session_detail(row: &rusqlite::Row) -> rusqlite::Result<SessionDetail> {
        Ok(SessionDetail {
            session: Self::row_to_session(row)?,
            task_title: row.get(15)?,
            category_id: row.get(16)?,
            category_name: row.get(17)?,
        })
    }
}
