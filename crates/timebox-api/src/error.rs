//! API errors and their JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use timebox_core::SessionError;
use timebox_storage::{NotFound, ValidationError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 400
    #[error("{0}")]
    BadRequest(String),

    /// 404
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// 409
    #[error("{0}")]
    Conflict(String),

    /// 500, logged
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Recover the domain error carried inside an `anyhow::Error`
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(validation) = e.downcast_ref::<ValidationError>() {
            return Self::Validation(validation.clone());
        }
        if let Some(not_found) = e.downcast_ref::<NotFound>() {
            return Self::NotFound(not_found.clone());
        }
        match e.downcast_ref::<SessionError>() {
            Some(err @ SessionError::AlreadyActive { .. }) => Self::Conflict(err.to_string()),
            Some(err @ SessionError::NotActive { .. }) => Self::BadRequest(err.to_string()),
            None => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(e) => {
                log::error!("Internal error: {e:#}");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "error": self.code(),
            "message": message,
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_status() {
        let validation: ApiError =
            anyhow::Error::from(ValidationError::Required { field: "title" }).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = anyhow::Error::from(NotFound::new("Task", 7)).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Task 7 not found");

        let busy: ApiError =
            anyhow::Error::from(SessionError::AlreadyActive { session_id: 3 }).into();
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let other: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::Internal(anyhow::anyhow!("secret path")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "an internal error occurred");
    }
}
