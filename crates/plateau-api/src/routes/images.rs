//! # Image API
//!
//! Upload, retrieval, listing, and maintenance of archived images.
//!
//! | Method | Path                              | Handler          |
//! |--------|-----------------------------------|------------------|
//! | POST   | `/v1/images/upload/:subject_name` | [`upload_image`] |
//! | GET    | `/v1/images`                      | [`list_images`]  |
//! | GET    | `/v1/images/:id`                  | [`get_image`]    |
//! | GET    | `/v1/images/:id/record`           | [`get_record`]   |
//! | PUT    | `/v1/images/:id`                  | [`update_image`] |
//! | DELETE | `/v1/images/:id`                  | [`delete_image`] |

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::Stream;
use plateau_archive::ExtractedFile;
use plateau_core::PageRequest;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_path, extract_query, extract_validated_json, Validate};
use crate::pipeline::{self, Ingest};
use crate::records::{AssetRecord, RecordFilter, RecordPatch};
use crate::staging::StagedUpload;
use crate::state::AppState;

/// Response header carrying the next page's cursor; empty on the last page.
pub const X_CURSOR: HeaderName = HeaderName::from_static("x-cursor");

const MAX_ROLE_LEN: usize = 64;

/// Multipart form accepted by the upload endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Image file.
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    /// Purpose tag, e.g. `profile_picture`.
    needs: String,
    /// Optional role label.
    role: Option<String>,
}

/// Listing query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Cursor from a previous response's `X-Cursor` header.
    pub cursor: Option<String>,
    /// Page size (default 3, maximum 100).
    pub num: Option<usize>,
    /// Only return records with this role.
    pub role: Option<String>,
}

/// Record update. Omitted fields are left unchanged; an empty `role`
/// clears it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateImageRequest {
    pub role: Option<String>,
}

impl Validate for UpdateImageRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.role {
            Some(role) if role.len() > MAX_ROLE_LEN => {
                Err(format!("role must not exceed {MAX_ROLE_LEN} characters"))
            }
            _ => Ok(()),
        }
    }
}

impl UpdateImageRequest {
    fn into_patch(self) -> RecordPatch {
        RecordPatch {
            role: self
                .role
                .map(|r| Some(r.trim().to_string()).filter(|r| !r.is_empty())),
        }
    }
}

/// Build the images router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/images", get(list_images))
        .route("/v1/images/upload/:subject_name", post(upload_image))
        .route(
            "/v1/images/:id",
            get(get_image).put(update_image).delete(delete_image),
        )
        .route("/v1/images/:id/record", get(get_record))
}

/// POST /v1/images/upload/:subject_name — Archive an uploaded image.
#[utoipa::path(
    post,
    path = "/v1/images/upload/{subject_name}",
    params(("subject_name" = String, Path, description = "Subject the image belongs to")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image archived", body = AssetRecord),
        (status = 422, description = "Invalid form, purpose, subject, or image", body = crate::error::ErrorBody),
        (status = 504, description = "Archiving exceeded the request deadline", body = crate::error::ErrorBody),
    ),
    tag = "images"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    subject_name: Result<Path<String>, PathRejection>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AssetRecord>), AppError> {
    let subject_name = extract_path(subject_name)?;
    let mut upload = None;
    let mut needs = None;
    let mut role = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                upload = Some(StagedUpload::from_field(&state.config.staging_dir, field).await?);
            }
            "needs" => {
                needs = Some(field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?);
            }
            "role" => {
                let value = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
                if value.len() > MAX_ROLE_LEN {
                    return Err(AppError::Validation(format!(
                        "role must not exceed {MAX_ROLE_LEN} characters"
                    )));
                }
                role = Some(value);
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let upload = upload
        .ok_or_else(|| AppError::Validation("multipart field \"image\" is required".to_string()))?;
    let purpose_tag = needs
        .ok_or_else(|| AppError::Validation("multipart field \"needs\" is required".to_string()))?;

    let record = pipeline::ingest(
        &state,
        Ingest {
            subject_name,
            purpose_tag,
            role,
            upload,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/images — List image records, newest first.
#[utoipa::path(
    get,
    path = "/v1/images",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of records", body = [AssetRecord],
            headers(("x-cursor" = String, description = "Cursor for the next page; empty on the last page"))),
        (status = 422, description = "Invalid cursor or query parameter", body = crate::error::ErrorBody),
    ),
    tag = "images"
)]
pub async fn list_images(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = extract_query(query)?;
    // Unencoded `+` in a query string arrives as a space.
    let cursor = query.cursor.map(|c| c.replace(' ', "+"));
    let page = PageRequest::from_query(cursor.as_deref(), query.num)?;
    let filter = RecordFilter {
        role: query.role.filter(|r| !r.is_empty()),
    };

    let page = state.records.fetch_page(&filter, &page);
    let token = HeaderValue::from_str(&page.next_token())
        .map_err(|e| AppError::Internal(format!("cursor is not a valid header value: {e}")))?;
    Ok(([(X_CURSOR, token)], Json(page.items)))
}

/// GET /v1/images/:id — Stream the stored image.
#[utoipa::path(
    get,
    path = "/v1/images/{id}",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Reconstructed image bytes, typed by content sniffing"),
        (status = 404, description = "Record or archive not found", body = crate::error::ErrorBody),
        (status = 422, description = "Archive could not be read", body = crate::error::ErrorBody),
    ),
    tag = "images"
)]
pub async fn get_image(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = extract_path(id)?;
    let served = pipeline::open(&state, id).await?;

    let file = tokio::fs::File::open(served.file.path())
        .await
        .map_err(|e| AppError::Unprocessable(format!("opening extracted file: {e}")))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| AppError::Unprocessable(format!("reading extracted file metadata: {e}")))?
        .len();
    let disposition = format!("inline; filename=\"{}\"", served.file.file_name());

    let body = Body::from_stream(ScopedFileStream {
        inner: ReaderStream::new(file),
        _file: served.file,
    });

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(served.content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// GET /v1/images/:id/record — Fetch an image's metadata record.
#[utoipa::path(
    get,
    path = "/v1/images/{id}/record",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record found", body = AssetRecord),
        (status = 404, description = "Record not found", body = crate::error::ErrorBody),
    ),
    tag = "images"
)]
pub async fn get_record(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AssetRecord>, AppError> {
    let id = extract_path(id)?;
    pipeline::find(&state, id).map(Json)
}

/// PUT /v1/images/:id — Update an image's mutable metadata.
#[utoipa::path(
    put,
    path = "/v1/images/{id}",
    params(("id" = Uuid, Path, description = "Record ID")),
    request_body = UpdateImageRequest,
    responses(
        (status = 200, description = "Record updated", body = AssetRecord),
        (status = 404, description = "Record not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid body", body = crate::error::ErrorBody),
    ),
    tag = "images"
)]
pub async fn update_image(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateImageRequest>, JsonRejection>,
) -> Result<Json<AssetRecord>, AppError> {
    let id = extract_path(id)?;
    let req = extract_validated_json(body)?;
    pipeline::update(&state, id, &req.into_patch()).map(Json)
}

/// DELETE /v1/images/:id — Remove an image record and its archive.
#[utoipa::path(
    delete,
    path = "/v1/images/{id}",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record and archive removed"),
        (status = 404, description = "Record not found", body = crate::error::ErrorBody),
    ),
    tag = "images"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = extract_path(id)?;
    pipeline::remove(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// File body that keeps its [`ExtractedFile`] alive until the stream is
/// dropped, whether the response completed or the client went away.
struct ScopedFileStream {
    inner: ReaderStream<tokio::fs::File>,
    _file: ExtractedFile,
}

impl Stream for ScopedFileStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
