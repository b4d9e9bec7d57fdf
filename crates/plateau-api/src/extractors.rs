//! # Request Validation
//!
//! [`Validate`] for request DTOs, a helper that extracts and validates a
//! JSON body in one step, and mappings that turn path and query rejections
//! into the structured 422 body instead of axum's plain-text 400.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::error::AppError;

/// Business-rule checks beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping rejections to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] checks.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract path parameters, mapping rejections to [`AppError::Validation`].
pub fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(v)| v)
        .map_err(|err| AppError::Validation(err.body_text()))
}

/// Extract query parameters, mapping rejections to [`AppError::Validation`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::Validation(err.body_text()))
}
