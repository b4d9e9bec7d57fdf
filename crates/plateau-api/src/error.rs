//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps archive and validation errors to HTTP status codes with a JSON
//! body of the form `{"error": {"code", "message"}}`.
//!
//! Storage and format failures surface to clients as a generic 422
//! `UNPROCESSABLE`: their full context, including filesystem paths, goes to
//! the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use plateau_archive::ArchiveError;
use plateau_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request content failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request could not be carried out against storage (422). The
    /// message is logged but not returned to the client.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// Blocking work did not finish within the request deadline (504).
    #[error("timed out: {0}")]
    Timeout(String),

    /// A dependency is not ready (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE"),
            Self::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Unprocessable(_) => "The request could not be processed".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Unprocessable(_) => tracing::warn!(error = %self, "request unprocessable"),
            Self::Timeout(_) | Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "request not served"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Core(e) => e.into(),
            ArchiveError::UnsupportedImageFormat { .. } => {
                Self::Validation("uploaded file is not a supported image".to_string())
            }
            ArchiveError::ArchiveNotFound { .. } => {
                Self::NotFound("stored asset is missing".to_string())
            }
            other => Self::Unprocessable(format!("{} ({})", other, error_chain(&other))),
        }
    }
}

/// Render the `source()` chain of an error, innermost last.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut cur = err.source();
    while let Some(e) = cur {
        parts.push(e.to_string());
        cur = e.source();
    }
    if parts.is_empty() {
        "no further detail".to_string()
    } else {
        parts.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound(String::new()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Validation(String::new()), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (AppError::BadRequest(String::new()), StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            (AppError::Unprocessable(String::new()), StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE"),
            (AppError::Timeout(String::new()), StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            (AppError::ServiceUnavailable(String::new()), StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            (AppError::Internal(String::new()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[tokio::test]
    async fn storage_errors_do_not_leak_paths() {
        let err: AppError = ArchiveError::StorageUnavailable {
            path: PathBuf::from("/srv/secret/archives"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(err.to_string().contains("/srv/secret/archives"));
        assert!(err.to_string().contains("denied"));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE");
        assert!(!body.to_string().contains("/srv/secret"));
    }

    #[tokio::test]
    async fn validation_messages_are_returned() {
        let err: AppError = ArchiveError::from(CoreError::UnsupportedPurpose("banner".into())).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("banner"));
    }

    #[test]
    fn missing_archive_maps_to_not_found() {
        let err: AppError = ArchiveError::ArchiveNotFound {
            path: PathBuf::from("/srv/a.tar.gz"),
        }
        .into();
        assert!(matches!(err, AppError::NotFound(ref m) if !m.contains("/srv")));
    }

    #[test]
    fn non_image_upload_is_validation() {
        let err: AppError = ArchiveError::UnsupportedImageFormat {
            path: PathBuf::from("/staging/x"),
            reason: "unrecognized".into(),
        }
        .into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
