//! Task endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use timebox_core::session_manager::{SessionManager, TaskProgress, ToggleResult};
use timebox_storage::{
    Database, EnergyLevel, NotFound, Priority, Task, TaskFilter, TaskQuery, TaskStatus,
};

use crate::error::ApiError;
use crate::extractors::{Id, JsonBody, QueryParams};
use crate::server::AppState;

const DEFAULT_ESTIMATE_MINUTES: u32 = 25;

/// Create or full-update body
#[derive(Debug, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
    #[serde(default)]
    pub goal_id: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub energy_level: EnergyLevel,
    #[serde(default = "default_estimate")]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

const fn default_estimate() -> u32 {
    DEFAULT_ESTIMATE_MINUTES
}

impl TaskPayload {
    fn apply(self, task: &mut Task) {
        task.title = self.title;
        task.description = self.description;
        task.category_id = self.category_id;
        task.goal_id = self.goal_id;
        task.priority = self.priority;
        task.energy_level = self.energy_level;
        task.estimated_minutes = self.estimated_minutes;
        task.due_date = self.due_date;
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub filter: Option<String>,
    pub search: Option<String>,
    pub category: Option<i64>,
    pub page: Option<u32>,
}

/// A task with its computed state
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub status: TaskStatus,
    pub is_overdue: bool,
}

impl TaskView {
    fn new(task: Task, now: DateTime<Utc>) -> Self {
        Self {
            status: task.status(now),
            is_overdue: task.is_overdue(now),
            task,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u32,
}

fn load_task(db: &Database, id: i64) -> anyhow::Result<Task> {
    Ok(db.get_task(id)?.ok_or(NotFound::new("Task", id))?)
}

/// GET /api/tasks - filtered, searched and paged
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<TaskListParams>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let filter = match params.filter.as_deref() {
        Some(raw) => raw.parse::<TaskFilter>().map_err(ApiError::BadRequest)?,
        None => TaskFilter::All,
    };
    let query = TaskQuery {
        filter,
        search: params.search.filter(|s| !s.trim().is_empty()),
        category_id: params.category,
        page: params.page.unwrap_or(1),
    };
    let now = Utc::now();
    let page = state.with_db(|db| db.list_tasks(&query, now)).await?;

    Ok(Json(TaskListResponse {
        tasks: page.tasks.into_iter().map(|t| TaskView::new(t, now)).collect(),
        page: page.page,
        total_pages: page.total_pages,
        total: page.total,
    }))
}

/// POST /api/tasks
async fn create_task(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let now = Utc::now();
    let task = state
        .with_db(|db| {
            let mut task = Task::new(String::new(), payload.category_id);
            payload.apply(&mut task);
            let id = db.create_task(&task)?;
            load_task(db, id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(TaskView::new(task, now))))
}

/// GET /api/tasks/{id}
async fn get_task(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<TaskView>, ApiError> {
    let task = state.with_db(|db| load_task(db, id)).await?;
    Ok(Json(TaskView::new(task, Utc::now())))
}

/// PUT /api/tasks/{id}
async fn update_task(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> Result<Json<TaskView>, ApiError> {
    let task = state
        .with_db(|db| {
            let mut task = load_task(db, id)?;
            payload.apply(&mut task);
            db.update_task(&task)?;
            load_task(db, id)
        })
        .await?;
    Ok(Json(TaskView::new(task, Utc::now())))
}

/// DELETE /api/tasks/{id}
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<StatusCode, ApiError> {
    state.with_db(|db| db.delete_task(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/{id}/toggle
async fn toggle_task(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<ToggleResult>, ApiError> {
    let result = state
        .with_db(|db| SessionManager::new(db).toggle_task_completion(id, Utc::now()))
        .await?;
    Ok(Json(result))
}

/// GET /api/tasks/{id}/progress
async fn task_progress(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<TaskProgress>, ApiError> {
    let progress = state
        .with_db(|db| SessionManager::new(db).task_progress(id, Utc::now()))
        .await?;
    Ok(Json(progress))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/toggle", post(toggle_task))
        .route("/api/tasks/{id}/progress", get(task_progress))
}
