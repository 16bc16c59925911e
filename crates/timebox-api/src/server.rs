//! Router, shared state and the HTTP server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use timebox_core::TimeboxConfig;
use timebox_storage::Database;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::cache::StatsCache;
use crate::error::ApiError;
use crate::routes;

/// Shared application state
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub stats_cache: StatsCache,
    pub config: TimeboxConfig,
}

impl AppState {
    #[must_use]
    pub fn new(db: Database, config: TimeboxConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            stats_cache: StatsCache::default(),
            config,
        }
    }

    /// Run `f` against the locked database, turning domain errors into API errors
    ///
    /// # Errors
    ///
    /// Returns whatever `f` fails with, mapped to its HTTP status
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let db = self.db.lock().await;
        f(&db).map_err(ApiError::from)
    }
}

/// `Host` without its port, lowercased
fn host_name(value: &str) -> String {
    let value = value.trim().to_lowercase();
    if let Some(rest) = value.strip_prefix('[') {
        // [::1]:8000
        return rest.split(']').next().unwrap_or_default().to_string();
    }
    match value.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host.to_string(),
        _ => value,
    }
}

/// Whether `host` is accepted; an empty list or `*` accepts anything
#[must_use]
pub fn host_allowed(allowed: &[String], host: Option<&str>) -> bool {
    if allowed.is_empty() || allowed.iter().any(|h| h == "*") {
        return true;
    }
    let Some(host) = host else {
        return false;
    };
    let host = host_name(host);
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        // ".example.com" matches the domain and its subdomains
        pattern.strip_prefix('.').map_or(pattern == host, |domain| {
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    })
}

async fn check_host(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok());
    if !host_allowed(&state.config.server.allowed_hosts, host) {
        log::warn!("Rejected request for disallowed host {host:?}");
        return ApiError::BadRequest("Invalid Host header".to_string()).into_response();
    }
    next.run(request).await
}

/// Every route behind the allowed-hosts check
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::tasks::router())
        .merge(routes::sessions::router())
        .merge(routes::categories::router())
        .merge(routes::goals::router())
        .merge(routes::stats::router())
        .merge(routes::export::router())
        .layer(middleware::from_fn_with_state(state.clone(), check_host))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener fails
pub async fn serve(db: Database, config: TimeboxConfig) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_addr))?;
    let app = create_router(Arc::new(AppState::new(db, config)));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl-C, starting shutdown"),
        Err(e) => log::error!("Failed to listen for Ctrl-C: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| (*h).to_string()).collect()
    }

    #[test]
    fn test_host_allowed() {
        let allowed = hosts(&["localhost", "127.0.0.1", ".example.com"]);
        assert!(host_allowed(&allowed, Some("localhost:8000")));
        assert!(host_allowed(&allowed, Some("127.0.0.1")));
        assert!(host_allowed(&allowed, Some("tb.example.com")));
        assert!(host_allowed(&allowed, Some("example.com")));
        assert!(!host_allowed(&allowed, Some("evil.com")));
        assert!(!host_allowed(&allowed, Some("notexample.com")));
        assert!(!host_allowed(&allowed, None));
    }

    #[test]
    fn test_wildcard_or_empty_allows_all() {
        assert!(host_allowed(&[], Some("anything")));
        assert!(host_allowed(&hosts(&["*"]), None));
    }

    #[test]
    fn test_host_name_strips_port() {
        assert_eq!(host_name("LocalHost:8000"), "localhost");
        assert_eq!(host_name("[::1]:8000"), "::1");
        assert_eq!(host_name("example.com"), "example.com");
    }
}
