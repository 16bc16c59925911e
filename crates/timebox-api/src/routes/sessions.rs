//! Session endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use timebox_core::session_manager::{
    CompleteSession, CompletedSession, SessionManager, StartSession,
};
use timebox_storage::{
    Database, NotFound, Session, SessionDetail, SessionOutcome, ValidationError,
};

use crate::error::ApiError;
use crate::extractors::{Id, JsonBody, QueryParams};
use crate::server::AppState;

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 500;

/// A session logged after the fact; running sessions go through `/api/sessions/start`
#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default = "default_planned")]
    pub planned_minutes: u32,
    /// Derived from start and end when omitted
    #[serde(default)]
    pub actual_minutes: Option<u32>,
    #[serde(default)]
    pub outcome: Option<SessionOutcome>,
    #[serde(default)]
    pub focus_rating: Option<u8>,
    #[serde(default)]
    pub energy_before: Option<u8>,
    #[serde(default)]
    pub energy_after: Option<u8>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub distractions: String,
    #[serde(default)]
    pub key_insights: String,
}

const fn default_planned() -> u32 {
    25
}

impl SessionPayload {
    fn into_session(self) -> Result<Session, ValidationError> {
        let end_time = self
            .end_time
            .ok_or(ValidationError::Required { field: "end_time" })?;
        if end_time < self.start_time {
            return Err(ValidationError::OutOfOrder {
                field: "end_time",
                earlier: "start_time",
            });
        }
        let mut session = Session::new(self.task_id, self.start_time, self.planned_minutes);
        session.end_time = Some(end_time);
        session.actual_minutes = Some(
            self.actual_minutes
                .unwrap_or_else(|| session.elapsed_minutes(end_time)),
        );
        session.outcome = self.outcome;
        session.focus_rating = self.focus_rating;
        session.energy_before = self.energy_before;
        session.energy_after = self.energy_after;
        session.notes = self.notes;
        session.distractions = self.distractions;
        session.key_insights = self.key_insights;
        Ok(session)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionListParams {
    pub limit: Option<u32>,
}

fn load_detail(db: &Database, id: i64) -> anyhow::Result<SessionDetail> {
    Ok(db
        .get_session_detail(id)?
        .ok_or(NotFound::new("Session", id))?)
}

/// GET /api/sessions - most recent first
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<SessionListParams>,
) -> Result<Json<Vec<SessionDetail>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let sessions = state.with_db(|db| db.recent_sessions(limit)).await?;
    Ok(Json(sessions))
}

/// POST /api/sessions
async fn create_session(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<SessionPayload>,
) -> Result<(StatusCode, Json<SessionDetail>), ApiError> {
    let detail = state
        .with_db(|db| {
            let id = db.create_session(&payload.into_session()?)?;
            load_detail(db, id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<SessionDetail>, ApiError> {
    Ok(Json(state.with_db(|db| load_detail(db, id)).await?))
}

/// DELETE /api/sessions/{id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<StatusCode, ApiError> {
    state.with_db(|db| db.delete_session(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/start - 409 while another session runs
async fn start_session(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<StartSession>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .with_db(|db| SessionManager::new(db).start_session(&request, Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/sessions/{id}/complete
async fn complete_session(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
    JsonBody(report): JsonBody<CompleteSession>,
) -> Result<Json<CompletedSession>, ApiError> {
    let completed = state
        .with_db(|db| SessionManager::new(db).complete_session(id, &report, Utc::now()))
        .await?;
    Ok(Json(completed))
}

/// POST /api/sessions/{id}/pause
async fn pause_session(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .with_db(|db| SessionManager::new(db).pause_session(id, Utc::now()))
        .await?;
    Ok(Json(session))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/start", post(start_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/complete", post(complete_session))
        .route("/api/sessions/{id}/pause", post(pause_session))
}
