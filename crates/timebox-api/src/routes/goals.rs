//! Goal endpoints; every goal is returned with its current progress

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use timebox_core::goals::{current_period_progress, goals_with_progress, GoalProgress};
use timebox_storage::{Database, Goal, GoalPeriod, GoalStatus, NotFound};

use crate::error::ApiError;
use crate::extractors::{Id, JsonBody, QueryParams};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct GoalPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
    pub target_hours_per_period: f64,
    #[serde(default)]
    pub period: GoalPeriod,
    #[serde(default)]
    pub status: GoalStatus,
    /// Defaults to today on create, unchanged on update
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl GoalPayload {
    fn apply(self, goal: &mut Goal) {
        goal.title = self.title;
        goal.description = self.description;
        goal.category_id = self.category_id;
        goal.target_hours_per_period = self.target_hours_per_period;
        goal.period = self.period;
        goal.status = self.status;
        if let Some(start) = self.start_date {
            goal.start_date = start;
        }
        goal.end_date = self.end_date;
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GoalListParams {
    pub status: Option<String>,
}

fn progress_of(db: &Database, id: i64) -> anyhow::Result<GoalProgress> {
    let goal = db.get_goal(id)?.ok_or(NotFound::new("Goal", id))?;
    current_period_progress(db, &goal, Utc::now().date_naive())
}

/// GET /api/goals - `?status=active` filters
async fn list_goals(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<GoalListParams>,
) -> Result<Json<Vec<GoalProgress>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<GoalStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let goals = state
        .with_db(|db| goals_with_progress(db, status, Utc::now().date_naive()))
        .await?;
    Ok(Json(goals))
}

/// POST /api/goals
async fn create_goal(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<GoalPayload>,
) -> Result<(StatusCode, Json<GoalProgress>), ApiError> {
    let goal = state
        .with_db(|db| {
            let mut goal = Goal::new(String::new(), payload.category_id, 0.0);
            payload.apply(&mut goal);
            let id = db.create_goal(&goal)?;
            progress_of(db, id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// GET /api/goals/{id}
async fn get_goal(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<GoalProgress>, ApiError> {
    Ok(Json(state.with_db(|db| progress_of(db, id)).await?))
}

/// PUT /api/goals/{id}
async fn update_goal(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
    JsonBody(payload): JsonBody<GoalPayload>,
) -> Result<Json<GoalProgress>, ApiError> {
    let goal = state
        .with_db(|db| {
            let mut goal = db.get_goal(id)?.ok_or(NotFound::new("Goal", id))?;
            payload.apply(&mut goal);
            db.update_goal(&goal)?;
            progress_of(db, id)
        })
        .await?;
    Ok(Json(goal))
}

/// DELETE /api/goals/{id}
async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<StatusCode, ApiError> {
    state.with_db(|db| db.delete_goal(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route(
            "/api/goals/{id}",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
}
