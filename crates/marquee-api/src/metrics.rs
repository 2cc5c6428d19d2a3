//! Catalog request metrics and the Prometheus `/metrics` endpoint.
//!
//! Labels use the matched route (`/api/movies/:id`), never the raw path:
//! every movie and actor id would otherwise become its own series.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Catalog request latency, by route.
pub const API_REQUEST_DURATION: &str = "marquee_api_request_duration_seconds";

/// Catalog requests served, by route and status class.
pub const API_REQUEST_TOTAL: &str = "marquee_api_request_total";

/// Searches and lookups refused before reaching the store.
pub const VALIDATION_REJECTIONS: &str = "marquee_api_validation_rejections_total";

const UNMATCHED_ENDPOINT: &str = "unmatched";

// Ten times the loosest health-check target.
const SLOW_REQUEST_SECS: f64 = 4.0;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and describes the API and store metrics.
///
/// Only the first call installs; later calls return the same handle.
///
/// # Panics
///
/// Panics if the Prometheus recorder cannot be installed; the server should
/// not start without it.
#[allow(clippy::panic)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_histogram!(
                API_REQUEST_DURATION,
                "Time to answer a catalog request in seconds"
            );
            describe_counter!(API_REQUEST_TOTAL, "Catalog requests answered");
            describe_counter!(
                VALIDATION_REJECTIONS,
                "Catalog requests rejected for invalid parameters or ids"
            );
            marquee_core::metrics::register_metrics();

            tracing::info!("Catalog metrics exported on /metrics");
            handle
        })
        .clone()
}

/// Returns the global Prometheus handle, if initialized.
#[must_use]
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn endpoint_label<B>(request: &axum::http::Request<B>) -> String {
    request.extensions().get::<MatchedPath>().map_or_else(
        || UNMATCHED_ENDPOINT.to_string(),
        |path| path.as_str().to_string(),
    )
}

/// Times every catalog request and counts it by outcome.
///
/// Records:
/// - `marquee_api_request_duration_seconds{endpoint, method, status_class}`
/// - `marquee_api_request_total{endpoint, method, status_class}`
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = endpoint_label(&request);
    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let labels = [
        ("endpoint", path.clone()),
        ("method", method),
        ("status_class", status_class(response.status()).to_string()),
    ];

    histogram!(API_REQUEST_DURATION, &labels).record(duration);
    counter!(API_REQUEST_TOTAL, &labels).increment(1);

    if duration > SLOW_REQUEST_SECS {
        tracing::warn!(
            endpoint = %path,
            status = %response.status().as_u16(),
            duration_secs = %duration,
            "Slow catalog request"
        );
    }

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "unknown",
    }
}

/// `GET /metrics`
pub async fn serve_metrics() -> impl IntoResponse {
    prometheus_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain; charset=utf-8")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

/// Records a request rejected by parameter validation.
pub fn record_validation_rejection(endpoint: &'static str) {
    counter!(VALIDATION_REJECTIONS, "endpoint" => endpoint).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(StatusCode::OK), "2xx");
        assert_eq!(status_class(StatusCode::BAD_REQUEST), "4xx");
        assert_eq!(status_class(StatusCode::NOT_FOUND), "4xx");
        assert_eq!(status_class(StatusCode::SERVICE_UNAVAILABLE), "5xx");
    }

    #[test]
    fn test_endpoint_label_unmatched() {
        let request = axum::http::Request::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        assert_eq!(endpoint_label(&request), UNMATCHED_ENDPOINT);
    }

    #[tokio::test]
    async fn request_metrics_use_matched_route() {
        let handle = init_metrics();
        let app = Router::new()
            .route("/api/movies/:id", get(|| async { StatusCode::OK }))
            .route_layer(axum::middleware::from_fn(metrics_middleware));

        let _response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/movies/tt0133093")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let metrics = handle.render();
        assert!(metrics.contains("endpoint=\"/api/movies/:id\""));
        assert!(!metrics.contains("endpoint=\"/api/movies/tt0133093\""));
    }

    #[test]
    fn validation_rejections_are_labelled_by_endpoint() {
        let handle = init_metrics();
        record_validation_rejection("/api/actors");

        let metrics = handle.render();
        assert!(metrics.contains(VALIDATION_REJECTIONS));
        assert!(metrics.contains("endpoint=\"/api/actors\""));
    }
}
