//! Axum HTTP API for the marketplace pricing core.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use routes::create_router;
pub use state::AppState;
