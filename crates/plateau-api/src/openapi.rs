//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented image routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Plateau Asset Pipeline API",
        version = "0.1.0",
        description = "Uploads images, stores each one as a compressed single-file archive keyed by its subject and purpose, and serves them back with cursor-paginated metadata listing."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::images::upload_image,
        crate::routes::images::list_images,
        crate::routes::images::get_image,
        crate::routes::images::get_record,
        crate::routes::images::update_image,
        crate::routes::images::delete_image,
    ),
    components(schemas(
        crate::records::AssetRecord,
        crate::routes::images::UploadForm,
        crate::routes::images::UpdateImageRequest,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "images", description = "Archived image upload, retrieval, and listing"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_image_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/images",
            "/v1/images/upload/{subject_name}",
            "/v1/images/{id}",
            "/v1/images/{id}/record",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_registers_schemas() {
        let spec = ApiDoc::openapi();
        let schemas = &spec.components.as_ref().unwrap().schemas;
        for name in ["AssetRecord", "UpdateImageRequest", "ErrorBody"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }
}
