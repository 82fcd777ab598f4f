//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::catalog::{brands, models};
use crate::handlers::health::{health, ready};
use crate::handlers::pricing::{estimate_v3, estimate_v4};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps, state.config.rate_limit_burst));

    let pricing_routes = Router::new()
        .route("/v1/pricing/v3", post(estimate_v3))
        .route("/v1/pricing/v4", post(estimate_v4))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_api_key))
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let catalog_routes = Router::new()
        .route("/v1/catalog/:subtype/brands", get(brands))
        .route("/v1/catalog/:subtype/models", get(models));

    let health_routes = Router::new().route("/health", get(health)).route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(pricing_routes)
        .merge(catalog_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
