//! `/v1/catalog/{subtype}/brands` and `/v1/catalog/{subtype}/models` (§6).

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandsResponse {
    pub subtype: String,
    pub brands: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub subtype: String,
    pub brand: String,
    pub models: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub brand: String,
}

const CACHE_CONTROL: &str = "public, max-age=3600";

pub async fn brands(State(state): State<AppState>, Path(subtype): Path<String>) -> Response {
    let body = BrandsResponse {
        brands: state.brand_catalog.brands(&subtype),
        subtype,
    };
    with_cache_control(Json(body))
}

pub async fn models(
    State(state): State<AppState>,
    Path(subtype): Path<String>,
    Query(query): Query<ModelsQuery>,
) -> Response {
    let body = ModelsResponse {
        models: state.brand_catalog.models(&subtype, &query.brand),
        subtype,
        brand: query.brand,
    };
    with_cache_control(Json(body))
}

fn with_cache_control<T: Serialize>(json: Json<T>) -> Response {
    let mut response = json.into_response();
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static(CACHE_CONTROL));
    response
}
