use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use timebox_api::{create_router, AppState};
use timebox_core::TimeboxConfig;
use timebox_storage::Database;
use tower::ServiceExt;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    create_router(Arc::new(AppState::new(db, TimeboxConfig::default())))
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost:8000");
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn work_category(app: &Router) -> i64 {
    let (_, categories) = send(app, request("GET", "/api/categories", None)).await;
    categories
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Work & Career")
        .unwrap()["id"]
        .as_i64()
        .unwrap()
}

async fn create_task(app: &Router, title: &str) -> i64 {
    let category_id = work_category(app).await;
    let (status, task) = send(
        app,
        request(
            "POST",
            "/api/tasks",
            Some(json!({"title": title, "category_id": category_id, "priority": 2})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    task["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_disallowed_host_is_rejected() {
    let app = app();
    let req = Request::builder()
        .uri("/health")
        .header("host", "evil.example")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_task_crud_and_toggle() {
    let app = app();
    let id = create_task(&app, "Write tests").await;

    let (status, task) = send(&app, request("GET", &format!("/api/tasks/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["priority"], 2);
    assert_eq!(task["status"], "in_progress");

    let (status, list) = send(&app, request("GET", "/api/tasks?filter=pending", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, toggled) = send(
        &app,
        request("POST", &format!("/api/tasks/{id}/toggle"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);

    let (status, progress) = send(
        &app,
        request("GET", &format!("/api/tasks/{id}/progress"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["completion_percentage"], 100);

    let (status, _) = send(&app, request("DELETE", &format!("/api/tasks/{id}"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, request("GET", &format!("/api/tasks/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_validation_and_bad_input() {
    let app = app();
    let category_id = work_category(&app).await;
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/tasks",
            Some(json!({"title": "  ", "category_id": category_id})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(&app, request("GET", "/api/tasks?filter=someday", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request("GET", "/api/tasks/abc", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_lifecycle_and_conflict() {
    let app = app();
    let task_id = create_task(&app, "Deep work").await;

    let (status, session) = send(
        &app,
        request(
            "POST",
            "/api/sessions/start",
            Some(json!({"task_id": task_id, "duration": 50})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["planned_minutes"], 50);
    assert_eq!(session["energy_before"], 3);
    let session_id = session["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        request("POST", "/api/sessions/start", Some(json!({"task_id": task_id}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, quick) = send(&app, request("GET", "/api/quick-stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quick["active_session"], true);

    let (status, done) = send(
        &app,
        request(
            "POST",
            &format!("/api/sessions/{session_id}/complete"),
            Some(json!({"outcome": "completed", "focus_rating": 4})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["session"]["actual_minutes"], 1);
    assert_eq!(done["break_duration"], 3);

    let (status, _) = send(
        &app,
        request("POST", &format!("/api/sessions/{session_id}/pause"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = send(&app, request("GET", "/api/sessions", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["task_title"], "Deep work");
}

#[tokio::test]
async fn test_logged_session_needs_a_valid_end() {
    let app = app();
    let task_id = create_task(&app, "Reading").await;

    // no end time would leave a second running session behind
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/sessions",
            Some(json!({"task_id": task_id, "start_time": "2024-03-11T09:00:00Z"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/sessions",
            Some(json!({
                "task_id": task_id,
                "start_time": "2024-03-11T09:00:00Z",
                "end_time": "2024-03-11T08:00:00Z",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/sessions",
            Some(json!({
                "task_id": task_id,
                "start_time": "2024-03-11T09:00:00Z",
                "end_time": "2024-03-11T10:00:00Z",
                "actual_minutes": 3_000_000_000_u64,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, logged) = send(
        &app,
        request(
            "POST",
            "/api/sessions",
            Some(json!({
                "task_id": task_id,
                "start_time": "2024-03-11T09:00:00Z",
                "end_time": "2024-03-11T09:40:00Z",
                "outcome": "completed",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(logged["actual_minutes"], 40);

    let (_, quick) = send(&app, request("GET", "/api/quick-stats", None)).await;
    assert_eq!(quick["active_session"], false);
}

#[tokio::test]
async fn test_category_delete_refused_with_tasks() {
    let app = app();
    let (status, category) = send(
        &app,
        request(
            "POST",
            "/api/categories",
            Some(json!({"name": "Side project", "category_type": "hobbies", "color": "#112233"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_i64().unwrap();

    send(
        &app,
        request(
            "POST",
            "/api/tasks",
            Some(json!({"title": "Sketch", "category_id": category_id})),
        ),
    )
    .await;

    let uri = format!("/api/categories/{category_id}");
    let (status, body) = send(&app, request("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("1 existing tasks"));

    let work = work_category(&app).await;
    let (status, _) = send(&app, request("DELETE", &format!("/api/categories/{work}"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_goal_includes_progress() {
    let app = app();
    let category_id = work_category(&app).await;
    let (status, goal) = send(
        &app,
        request(
            "POST",
            "/api/goals",
            Some(json!({"title": "Ten hours", "category_id": category_id, "target_hours_per_period": 10})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(goal["progress"], 0.0);
    assert_eq!(goal["period"], "weekly");

    let (status, goals) = send(&app, request("GET", "/api/goals?status=active", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goals.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stats_endpoints() {
    let app = app();
    let (status, stats) = send(&app, request("GET", "/api/analytics-stats?period=7", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["period"], "7");
    assert_eq!(stats["daily"].as_array().unwrap().len(), 7);

    let (_, fallback) = send(&app, request("GET", "/api/analytics-stats?period=abc", None)).await;
    assert_eq!(fallback["period"], "30");

    let (status, dashboard) = send(&app, request("GET", "/api/dashboard-stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["pending_tasks"], 0);
}

#[tokio::test]
async fn test_exports() {
    let app = app();
    create_task(&app, "Export me").await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/export/tasks.csv", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"timebox_tasks.csv\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.contains("Export me,Work & Career,,High"));

    let (status, all) = send(&app, request("GET", "/api/export/all.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["user"], "default");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/export/all.zip", None))
        .await
        .unwrap();
    assert_eq!(response.headers()["content-type"], "application/zip");

    let (status, _) = send(&app, request("GET", "/api/export/users.csv", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
