use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::dto::ErrorResponse;
use crate::ingest::IngestError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Ingest(e) if e.is_client_error() => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(e.to_string()))
            }
            AppError::Ingest(IngestError::Persistence { errors }) => {
                let mut body = ErrorResponse::new("Failed to save some or all of the data.");
                body.errors = errors.iter().map(ToString::to_string).collect();
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            AppError::Ingest(e) => {
                error!(error = %e, "Ingestion failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(e.to_string()))
            }
            AppError::Database(e) => {
                error!(error = %e, "Query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(format!("database error: {e}")))
            }
        };
        (status, Json(body)).into_response()
    }
}
