//! Liveness/readiness handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub adapters_registered: usize,
}

pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        adapters_registered: 0,
    })
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    (
        StatusCode::OK,
        Json(HealthBody {
            status: "ready",
            adapters_registered: state.adapters.adapter_count(),
        }),
    )
}
