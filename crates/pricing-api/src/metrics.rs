//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;
use std::time::Instant;

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "pricing_api_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "pricing_api_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "pricing_api_http_requests_in_flight";
}

fn sanitize_path(path: &str) -> String {
    let path = Regex::new(r"/v1/catalog/[a-zA-Z0-9_-]+")
        .unwrap()
        .replace_all(path, "/v1/catalog/:subtype");
    path.to_string()
}

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = sanitize_path(request.uri().path());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16().to_string();
    let duration = start.elapsed().as_secs_f64();

    let labels = [("method", method), ("path", path), ("status", status)];
    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_catalog_subtype() {
        assert_eq!(sanitize_path("/v1/catalog/electronics_smartphone/brands"), "/v1/catalog/:subtype/brands");
    }
}
