//! Category endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use timebox_storage::{Category, CategoryType, Database, NotFound};

use crate::error::ApiError;
use crate::extractors::{Id, JsonBody, QueryParams};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    #[serde(default)]
    pub category_type: CategoryType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl CategoryPayload {
    fn apply(self, category: &mut Category) {
        category.name = self.name;
        category.category_type = self.category_type;
        category.description = self.description;
        if let Some(color) = self.color {
            category.color = color;
        }
        if let Some(icon) = self.icon {
            category.icon = icon;
        }
        category.is_active = self.is_active;
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListParams {
    #[serde(default)]
    pub active: bool,
}

fn load_category(db: &Database, id: i64) -> anyhow::Result<Category> {
    Ok(db.get_category(id)?.ok_or(NotFound::new("Category", id))?)
}

/// GET /api/categories - `?active=true` hides archived ones
async fn list_categories(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<CategoryListParams>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state
        .with_db(|db| db.list_categories(params.active))
        .await?;
    Ok(Json(categories))
}

/// POST /api/categories
async fn create_category(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state
        .with_db(|db| {
            let mut category = Category::new(String::new(), CategoryType::default());
            payload.apply(&mut category);
            let id = db.create_category(&category)?;
            load_category(db, id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/categories/{id}
async fn get_category(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.with_db(|db| load_category(db, id)).await?))
}

/// PUT /api/categories/{id}
async fn update_category(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
    JsonBody(payload): JsonBody<CategoryPayload>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .with_db(|db| {
            let mut category = load_category(db, id)?;
            payload.apply(&mut category);
            db.update_category(&category)?;
            load_category(db, id)
        })
        .await?;
    Ok(Json(category))
}

/// DELETE /api/categories/{id} - refused while tasks still use it
async fn delete_category(
    State(state): State<Arc<AppState>>,
    Id(id): Id,
) -> Result<StatusCode, ApiError> {
    // zero means deleted
    let blocking_tasks = state
        .with_db(|db| {
            load_category(db, id)?;
            let tasks = db.count_tasks_in_category(id)?;
            if tasks == 0 {
                db.delete_category(id)?;
            }
            Ok(tasks)
        })
        .await?;
    if blocking_tasks > 0 {
        return Err(ApiError::BadRequest(format!(
            "Cannot delete category with {blocking_tasks} existing tasks. Please reassign or delete the tasks first."
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}
