//! Axum API server binary.

use std::net::SocketAddr;

use pricing_core::{AdapterRegistry, BrandModelCatalog, CategoryCatalog, PricingConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricing_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("pricing=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("starting pricing-api");

    let config = ApiConfig::from_env();
    info!(host = %config.host, port = config.port, "api config loaded");

    let pricing_config = PricingConfig::from_env();

    // Marketplace adapters and catalogs are host-provided: this binary
    // starts with empty registries and relies on deployment-specific
    // bootstrapping (e.g. a sidecar loader reading the persisted JSON
    // configs named in §6) to populate them before traffic is routed here.
    let adapters = AdapterRegistry::new();
    let catalog = CategoryCatalog::new();
    let brand_catalog = BrandModelCatalog::new();

    let state = AppState::new(config.clone(), pricing_config, adapters, catalog, brand_catalog, None);
    state.spawn_cache_janitor();

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid bind address");

    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    info!("server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
    info!("received shutdown signal");
}
