pub mod file_handler;
pub mod repository_handler;

pub use file_handler::FileHandler;
pub use repository_handler::RepositoryHandler;

use axum::{Json, http::StatusCode};

use crate::domain::stores::{ConstraintKind, StoreError};
use crate::presentation::http::dto::ApiResponse;

pub(crate) type HandlerResponse<T> = (StatusCode, Json<ApiResponse<T>>);

pub(crate) fn failure<T>(status: StatusCode, code: &str, message: String) -> HandlerResponse<T> {
    (status, Json(ApiResponse::error(code, message, None)))
}

/// Maps a store failure onto an HTTP status and error code.
pub(crate) fn store_failure<T>(error: &StoreError) -> HandlerResponse<T> {
    let (status, code) = match error {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        StoreError::ConstraintViolation { kind, .. } => (
            StatusCode::CONFLICT,
            match kind {
                ConstraintKind::Unique => "UNIQUE_VIOLATION",
                ConstraintKind::ForeignKey => "FOREIGN_KEY_VIOLATION",
                ConstraintKind::SameScope => "REPOSITORY_MISMATCH",
                ConstraintKind::Acyclic => "DIRECTORY_CYCLE",
            },
        ),
        StoreError::Connection(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
        StoreError::Transaction(_) => (StatusCode::SERVICE_UNAVAILABLE, "TRANSACTION_ERROR"),
        StoreError::Initialization(_) | StoreError::Unknown(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };
    if status.is_server_error() {
        tracing::error!("Store error: {}", error);
    }
    failure(status, code, error.to_string())
}
