//! File downloads: one entity as CSV or JSON, or everything at once

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use chrono::Utc;
use timebox_core::export::{
    export_all_json, export_all_zip, export_entity, ExportEntity, ExportFormat,
    ALL_JSON_FILE_NAME, ALL_ZIP_FILE_NAME,
};

use crate::error::ApiError;
use crate::server::AppState;

/// What a `/api/export/{file}` name asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRequest {
    Entity(ExportEntity, ExportFormat),
    AllJson,
    AllZip,
}

impl std::str::FromStr for ExportRequest {
    type Err = String;

    fn from_str(file: &str) -> Result<Self, Self::Err> {
        match file {
            "all.json" => Ok(Self::AllJson),
            "all.zip" => Ok(Self::AllZip),
            _ => {
                let (entity, format) = file
                    .rsplit_once('.')
                    .ok_or_else(|| format!("Unknown export: {file}"))?;
                Ok(Self::Entity(entity.parse()?, format.parse()?))
            }
        }
    }
}

fn attachment(content_type: &str, file_name: &str, body: impl IntoResponse) -> Response {
    (
        [
            (CONTENT_TYPE, content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/export/{file}
async fn export_file(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let request = file.parse::<ExportRequest>().map_err(ApiError::BadRequest)?;
    let now = Utc::now();
    let response = match request {
        ExportRequest::Entity(entity, format) => {
            let body = state
                .with_db(|db| export_entity(db, entity, format, now))
                .await?;
            attachment(format.content_type(), &entity.file_name(format), body)
        }
        ExportRequest::AllJson => {
            let profile = state.config.profile.clone();
            let body = state
                .with_db(|db| export_all_json(db, &profile, now))
                .await?;
            attachment("application/json", ALL_JSON_FILE_NAME, body)
        }
        ExportRequest::AllZip => {
            let body = state.with_db(|db| export_all_zip(db, now)).await?;
            attachment("application/zip", ALL_ZIP_FILE_NAME, body)
        }
    };
    log::info!("Exported {file}");
    Ok(response)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/export/{file}", get(export_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_request() {
        assert_eq!("all.zip".parse(), Ok(ExportRequest::AllZip));
        assert_eq!("all.json".parse(), Ok(ExportRequest::AllJson));
        assert_eq!(
            "habits.csv".parse(),
            Ok(ExportRequest::Entity(ExportEntity::Habits, ExportFormat::Csv))
        );
        assert!("habits.xml".parse::<ExportRequest>().is_err());
        assert!("users.json".parse::<ExportRequest>().is_err());
        assert!("sessions".parse::<ExportRequest>().is_err());
    }
}
