//! # plateau-api — HTTP Surface for the Asset Pipeline
//!
//! Accepts image uploads, archives each one under a key derived from its
//! subject name and purpose, and serves the reconstructed files back.
//! Records live in an [`records::AssetRecords`] store; archives live in a
//! [`plateau_archive::ArchiveStore`].
//!
//! ## API Surface
//!
//! | Method | Path                              | Purpose                        |
//! |--------|-----------------------------------|--------------------------------|
//! | POST   | `/v1/images/upload/:subject_name` | Probe, archive, and record     |
//! | GET    | `/v1/images`                      | Cursor-paginated listing       |
//! | GET    | `/v1/images/:id`                  | Stream the reconstructed image |
//! | GET    | `/v1/images/:id/record`           | Record metadata                |
//! | PUT    | `/v1/images/:id`                  | Update role                    |
//! | DELETE | `/v1/images/:id`                  | Remove archive and record      |
//! | GET    | `/health/liveness`                | Process is up                  |
//! | GET    | `/health/readiness`               | Archive root is writable       |
//! | GET    | `/metrics`                        | Prometheus exposition          |
//! | GET    | `/openapi.json`                   | Generated OpenAPI document     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → DefaultBodyLimit → Handler
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod pipeline;
pub mod records;
pub mod routes;
pub mod staging;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::images::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(state.metrics.clone()));
    }

    let api = api.layer(TraceLayer::new_for_http()).with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if metrics_on {
        probes = probes
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(state.metrics.clone()));
    }

    Router::new().merge(probes.with_state(state)).merge(api)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Ready when the archive root accepts writes.
///
/// Returns 200 "ready", or 503 with the structured error body.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let archives = state.archives.clone();
    match tokio::task::spawn_blocking(move || archives.check_writable()).await {
        Ok(Ok(())) => Ok("ready"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "archive storage not writable");
            Err(AppError::ServiceUnavailable(
                "archive storage not writable".to_string(),
            ))
        }
        Err(e) => Err(AppError::ServiceUnavailable(format!(
            "readiness check failed: {e}"
        ))),
    }
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Refreshes the record gauge on each scrape.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.records_total().set(state.records.len() as i64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}
