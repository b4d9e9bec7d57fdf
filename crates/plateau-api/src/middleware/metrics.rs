//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware, labelled with the matched route template rather than the
//! raw path so subject names and ids do not explode label cardinality.
//!
//! Pipeline counters (archives written, extractions served, failures by
//! kind) are pushed by the service layer. The record gauge is refreshed on
//! each `/metrics` scrape.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    archives_written_total: IntCounter,
    archived_bytes_total: IntCounter,
    extractions_total: IntCounter,
    pipeline_failures_total: IntCounterVec,

    records_total: IntGauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("plateau_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "plateau_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("plateau_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let archives_written_total =
            IntCounter::new("plateau_archives_written_total", "Archives committed")
                .expect("metric can be created");

        let archived_bytes_total = IntCounter::new(
            "plateau_archived_bytes_total",
            "Uncompressed bytes committed to archives",
        )
        .expect("metric can be created");

        let extractions_total =
            IntCounter::new("plateau_extractions_total", "Archives extracted for serving")
                .expect("metric can be created");

        let pipeline_failures_total = IntCounterVec::new(
            Opts::new(
                "plateau_pipeline_failures_total",
                "Archive, extract, and probe failures by operation and error kind",
            ),
            &["operation", "kind"],
        )
        .expect("metric can be created");

        let records_total = IntGauge::new("plateau_records_total", "Stored asset records")
            .expect("metric can be created");

        let collectors: [Box<dyn Collector>; 8] = [
            Box::new(http_requests_total.clone()),
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(archives_written_total.clone()),
            Box::new(archived_bytes_total.clone()),
            Box::new(extractions_total.clone()),
            Box::new(pipeline_failures_total.clone()),
            Box::new(records_total.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                archives_written_total,
                archived_bytes_total,
                extractions_total,
                pipeline_failures_total,
                records_total,
            }),
        }
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counters(&self.inner.http_errors_total)
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    pub fn record_archive_written(&self, source_bytes: u64) {
        self.inner.archives_written_total.inc();
        self.inner.archived_bytes_total.inc_by(source_bytes);
    }

    pub fn record_extraction(&self) {
        self.inner.extractions_total.inc();
    }

    pub fn record_pipeline_failure(&self, operation: &str, kind: &str) {
        self.inner
            .pipeline_failures_total
            .with_label_values(&[operation, kind])
            .inc();
    }

    pub fn archives_written(&self) -> u64 {
        self.inner.archives_written_total.get()
    }

    pub fn extractions(&self) -> u64 {
        self.inner.extractions_total.get()
    }

    pub fn pipeline_failures(&self) -> u64 {
        sum_counters(&self.inner.pipeline_failures_total)
    }

    /// Access the record gauge for updating on scrape.
    pub fn records_total(&self) -> &IntGauge {
        &self.inner.records_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}
