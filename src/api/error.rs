use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    MissingReference(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Translate a store failure. Client faults keep their message; anything
    /// else is logged here and replaced with `context`.
    pub fn from_store(err: StoreError, context: &str) -> Self {
        match err {
            StoreError::Validation { .. } => ApiError::Validation(err.to_string()),
            StoreError::MissingReference(_) => ApiError::MissingReference(err.to_string()),
            StoreError::Duplicate(_) => ApiError::Duplicate(err.to_string()),
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::InUse(_) => ApiError::Conflict(err.to_string()),
            StoreError::Sqlite(_)
            | StoreError::Pool(_)
            | StoreError::Io(_)
            | StoreError::Task(_) => {
                error!(error = %err, "{context}");
                ApiError::Internal(context.to_string())
            }
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::MissingReference(_) => (StatusCode::BAD_REQUEST, "MISSING_REFERENCE"),
            ApiError::Duplicate(_) => (StatusCode::BAD_REQUEST, "DUPLICATE"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "IN_USE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::from_store(err, "request failed")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_client_statuses() {
        let cases = [
            (StoreError::validation("gender", "bad gender"), StatusCode::BAD_REQUEST),
            (StoreError::MissingReference("class".into()), StatusCode::BAD_REQUEST),
            (StoreError::Duplicate("student id".into()), StatusCode::BAD_REQUEST),
            (StoreError::not_found("student"), StatusCode::NOT_FOUND),
            (StoreError::InUse("course".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn infrastructure_errors_hide_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let api = ApiError::from_store(StoreError::Io(io), "backup failed");
        assert_eq!(api.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.to_string(), "backup failed");
    }
}
