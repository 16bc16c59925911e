//! Dashboard and analytics numbers

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use timebox_core::analytics::{
    parse_period, period_range, Analytics, AnalyticsStats, DashboardStats, QuickStats,
};

use crate::cache::StatsCache;
use crate::error::ApiError;
use crate::extractors::QueryParams;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    /// Days; anything unusable falls back to 30
    pub period: Option<String>,
}

/// GET /api/dashboard-stats
async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = state
        .with_db(|db| Analytics::new(db).dashboard_stats(Utc::now()))
        .await?;
    Ok(Json(stats))
}

/// GET /api/analytics-stats?period=N - cached briefly per period and day
async fn analytics_stats(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<PeriodParams>,
) -> Result<Json<AnalyticsStats>, ApiError> {
    let days = parse_period(params.period.as_deref());
    let now = Utc::now();
    let (start, end) = period_range(days, now.date_naive());
    let key = StatsCache::key(&days.to_string(), start, end);

    if let Some(hit) = state.stats_cache.get(&key).await {
        log::debug!("Analytics cache hit for {key}");
        return Ok(Json(hit));
    }
    let stats = state
        .with_db(|db| Analytics::new(db).analytics_stats(days, now))
        .await?;
    state.stats_cache.put(stats.clone()).await;
    Ok(Json(stats))
}

/// GET /api/quick-stats
async fn quick_stats(State(state): State<Arc<AppState>>) -> Result<Json<QuickStats>, ApiError> {
    let stats = state
        .with_db(|db| Analytics::new(db).quick_stats(Utc::now()))
        .await?;
    Ok(Json(stats))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard-stats", get(dashboard_stats))
        .route("/api/analytics-stats", get(analytics_stats))
        .route("/api/quick-stats", get(quick_stats))
}
