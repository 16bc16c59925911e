//! Starting, finishing and pausing timebox sessions.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use timebox_storage::{Database, NotFound, Preferences, Session, SessionOutcome};

/// Energy recorded for an explicit start when none is given
pub const DEFAULT_ENERGY_BEFORE: u8 = 3;

const PAUSED_NOTE: &str = "Session paused by user";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("You already have an active session (session {session_id}). Please complete or pause it first.")]
    AlreadyActive { session_id: i64 },

    #[error("Session {session_id} is not active")]
    NotActive { session_id: i64 },
}

/// Parameters for an explicit session start
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSession {
    pub task_id: i64,
    /// Falls back to the preferred work duration
    #[serde(default, alias = "duration")]
    pub planned_minutes: Option<u32>,
    #[serde(default)]
    pub energy_before: Option<u8>,
}

/// What the user reports when finishing a session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompleteSession {
    pub outcome: SessionOutcome,
    pub focus_rating: Option<u8>,
    pub energy_after: Option<u8>,
    pub notes: String,
    pub distractions: String,
    pub key_insights: String,
    /// Also mark the session's task as completed
    pub task_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedSession {
    pub session: Session,
    /// Suggested break in minutes
    pub break_duration: u32,
}

/// Live progress of a task, including any running session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgress {
    pub task_id: i64,
    pub total_minutes: u32,
    pub completion_percentage: u32,
    pub has_active_session: bool,
    pub active_elapsed: u32,
    pub is_completed: bool,
}

/// Outcome of flipping a task's completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleResult {
    pub task_id: i64,
    pub completed: bool,
    /// Session closed because its task was completed
    pub closed_session_id: Option<i64>,
}

/// Session lifecycle operations over a borrowed database
pub struct SessionManager<'a> {
    db: &'a Database,
}

impl<'a> SessionManager<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Start a session, refusing while another one is running
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyActive`, `NotFound` for an unknown task,
    /// `ValidationError` for bad values, or a database error
    pub fn start_session(&self, request: &StartSession, now: DateTime<Utc>) -> Result<Session> {
        let planned = match request.planned_minutes {
            Some(minutes) => minutes,
            None => self.db.get_preferences()?.default_work_duration,
        };
        self.start(
            request.task_id,
            planned,
            Some(request.energy_before.unwrap_or(DEFAULT_ENERGY_BEFORE)),
            now,
        )
    }

    /// Start a session at the preferred work duration without an energy reading
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_session`]
    pub fn quick_start(&self, task_id: i64, now: DateTime<Utc>) -> Result<Session> {
        let planned = self.db.get_preferences()?.default_work_duration;
        self.start(task_id, planned, None, now)
    }

    fn start(
        &self,
        task_id: i64,
        planned_minutes: u32,
        energy_before: Option<u8>,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        if let Some(active) = self.db.active_session()? {
            return Err(SessionError::AlreadyActive {
                session_id: active.id,
            }
            .into());
        }
        let task = self
            .db
            .get_task(task_id)?
            .ok_or(NotFound::new("Task", task_id))?;

        let mut session = Session::new(task.id, now, planned_minutes);
        session.energy_before = energy_before;
        session.id = self.db.create_session(&session)?;

        log::info!(
            "Started session {} for \"{}\" ({planned_minutes} min)",
            session.id,
            task.title
        );
        Ok(session)
    }

    /// Finish an active session with the user's report
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `SessionError::NotActive`, `ValidationError`, or a database error
    pub fn complete_session(
        &self,
        session_id: i64,
        report: &CompleteSession,
        now: DateTime<Utc>,
    ) -> Result<CompletedSession> {
        let mut session = self.active_by_id(session_id)?;

        session.end_time = Some(now);
        session.actual_minutes = Some(session.elapsed_minutes(now));
        session.outcome = Some(report.outcome);
        session.focus_rating = report.focus_rating;
        session.energy_after = report.energy_after;
        session.notes.clone_from(&report.notes);
        session.distractions.clone_from(&report.distractions);
        session.key_insights.clone_from(&report.key_insights);
        self.db.update_session(&session)?;

        if report.task_completed {
            self.db.set_task_completed(session.task_id, true, now)?;
        }

        let break_duration = simple_break_duration(&session);
        log::info!(
            "Completed session {session_id} after {} min ({})",
            session.actual_minutes.unwrap_or_default(),
            report.outcome
        );
        Ok(CompletedSession {
            session,
            break_duration,
        })
    }

    /// Stop an active session early, recording it as interrupted
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `SessionError::NotActive`, or a database error
    pub fn pause_session(&self, session_id: i64, now: DateTime<Utc>) -> Result<Session> {
        let mut session = self.active_by_id(session_id)?;
        session.end_time = Some(now);
        session.actual_minutes = Some(session.elapsed_minutes(now));
        session.outcome = Some(SessionOutcome::Interrupted);
        session.notes = PAUSED_NOTE.to_string();
        self.db.update_session(&session)?;
        log::info!("Paused session {session_id}");
        Ok(session)
    }

    /// Flip a task's completion. Completing closes the task's running session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error
    pub fn toggle_task_completion(&self, task_id: i64, now: DateTime<Utc>) -> Result<ToggleResult> {
        let task = self
            .db
            .get_task(task_id)?
            .ok_or(NotFound::new("Task", task_id))?;
        let completed = !task.is_completed;

        let mut closed_session_id = None;
        if completed {
            if let Some(mut active) = self.db.active_session_for_task(task_id)? {
                active.end_time = Some(now);
                active.actual_minutes = Some(active.elapsed_minutes(now));
                active.outcome = Some(SessionOutcome::Completed);
                self.db.update_session(&active)?;
                closed_session_id = Some(active.id);
            }
        }
        self.db.set_task_completed(task_id, completed, now)?;

        log::info!(
            "Task \"{}\" has been {}",
            task.title,
            if completed { "completed" } else { "reopened" }
        );
        Ok(ToggleResult {
            task_id,
            completed,
            closed_session_id,
        })
    }

    /// Minutes spent on a task so far and how far along its estimate it is
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error
    pub fn task_progress(&self, task_id: i64, now: DateTime<Utc>) -> Result<TaskProgress> {
        let task = self
            .db
            .get_task(task_id)?
            .ok_or(NotFound::new("Task", task_id))?;
        let logged = self.db.logged_minutes_for_task(task_id)?;
        let active = self.db.active_session_for_task(task_id)?;
        let active_elapsed = active.as_ref().map_or(0, |s| s.elapsed_minutes(now));
        let total_minutes = logged.saturating_add(active_elapsed);

        let completion_percentage = if task.is_completed {
            100
        } else if task.estimated_minutes > 0 {
            let pct = f64::from(total_minutes) / f64::from(task.estimated_minutes) * 100.0;
            // truncated like the progress bar shows it
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pct = pct.min(100.0) as u32;
            pct
        } else {
            0
        };

        Ok(TaskProgress {
            task_id,
            total_minutes,
            completion_percentage,
            has_active_session: active.is_some(),
            active_elapsed,
            is_completed: task.is_completed,
        })
    }

    fn active_by_id(&self, session_id: i64) -> Result<Session> {
        let session = self
            .db
            .get_session(session_id)?
            .ok_or(NotFound::new("Session", session_id))?;
        if !session.is_active() {
            return Err(SessionError::NotActive { session_id }.into());
        }
        Ok(session)
    }
}

/// Break suggested right after finishing a session
#[must_use]
pub fn simple_break_duration(session: &Session) -> u32 {
    if session.actual_minutes.unwrap_or(0) > 60 {
        15
    } else if session.focus_rating.is_some_and(|f| f >= 4) {
        3
    } else {
        5
    }
}

/// Break length adjusted to the user's preferences and how the session went
#[must_use]
pub fn calculate_break_duration(preferences: Option<&Preferences>, session: &Session) -> u32 {
    let Some(preferences) = preferences else {
        return 5;
    };
    let mut minutes = if session.actual_minutes.unwrap_or(0) > 60 {
        preferences.long_break_duration
    } else {
        preferences.default_break_duration
    };
    match session.focus_rating {
        Some(focus) if focus >= 4 => minutes = minutes.saturating_sub(2).max(3),
        Some(focus) if focus <= 2 => minutes += 3,
        _ => {}
    }
    minutes.clamp(3, 30)
}
