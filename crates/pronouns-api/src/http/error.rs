//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use pronouns_types::error::{PlatformIdError, PronounError, StoreError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Preference store and resolver errors.
    Store(StoreError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<PronounError> for AppError {
    fn from(e: PronounError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<PlatformIdError> for AppError {
    fn from(e: PlatformIdError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
            AppError::Store(StoreError::StorageUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::StorageCorrupt(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Store(StoreError::NotFound) => "NOT_FOUND",
            AppError::Store(StoreError::VersionConflict { .. }) => "VERSION_CONFLICT",
            AppError::Store(StoreError::StorageUnavailable(_)) => "STORAGE_UNAVAILABLE",
            AppError::Store(StoreError::StorageCorrupt(_)) => "STORAGE_CORRUPT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, details) = match &self {
            AppError::Store(StoreError::NotFound) => ("Not found".to_string(), None),
            AppError::Store(StoreError::VersionConflict { expected, actual }) => (
                format!("Version conflict: expected {expected}, current is {actual}"),
                Some(json!({ "expected": expected, "actual": actual })),
            ),
            AppError::Store(StoreError::StorageCorrupt(reason)) => {
                tracing::error!(%reason, "request failed on corrupt storage");
                ("Internal storage error".to_string(), None)
            }
            AppError::Store(e) => (e.to_string(), None),
            AppError::Unauthorized(msg) | AppError::Validation(msg) | AppError::Internal(msg) => {
                (msg.clone(), None)
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [error]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status_codes() {
        let cases = [
            (StoreError::NotFound, StatusCode::NOT_FOUND),
            (
                StoreError::VersionConflict { expected: 1, actual: 2 },
                StatusCode::CONFLICT,
            ),
            (
                StoreError::StorageUnavailable("busy".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                StoreError::StorageCorrupt("bad json".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn validation_and_auth_statuses() {
        assert_eq!(
            AppError::from(PronounError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PlatformIdError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("no key".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn into_response_keeps_status() {
        let resp = AppError::from(StoreError::VersionConflict { expected: 0, actual: 3 }).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
