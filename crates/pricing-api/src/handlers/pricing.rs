//! `/v1/pricing/v3` and `/v1/pricing/v4` handlers (§6).

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use pricing_core::{PricingRequest, V3Service, V4Service};
use pricing_models::{Condition, PricingConfidence, PricingStatus};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const PROMPT_VERSION: &str = "v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V3Request {
    pub item_id: String,
    pub brand: String,
    pub product_type: String,
    pub model: Option<String>,
    pub condition: Condition,
    pub country_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V4Request {
    pub item_id: String,
    pub brand: String,
    pub product_type: String,
    pub model: Option<String>,
    pub condition: Condition,
    pub country_code: String,
    #[serde(default)]
    pub preferred_marketplaces: Vec<String>,
    #[serde(default)]
    pub variant_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub completeness: Vec<String>,
    pub identifier: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V3PricingBody {
    pub status: &'static str,
    pub country_code: String,
    pub marketplaces_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RangeBody {
    pub low: f64,
    pub median: f64,
    pub high: f64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V3Response {
    pub success: bool,
    pub pricing: V3PricingBody,
    pub cached: bool,
    pub processing_time_ms: u64,
    pub prompt_version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V4PricingBody {
    pub status: &'static str,
    pub country_code: String,
    pub sources: Vec<SourceBody>,
    pub total_listings_analyzed: usize,
    pub time_window_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeBody>,
    pub sample_listings: Vec<ListingBody>,
    pub confidence: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBody {
    pub marketplace_id: String,
    pub listing_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ListingBody {
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct V4Response {
    pub success: bool,
    pub pricing: V4PricingBody,
    pub cached: bool,
    pub processing_time_ms: u64,
}

fn status_label(status: PricingStatus) -> &'static str {
    match status {
        PricingStatus::Ok => "OK",
        PricingStatus::NoResults => "NO_RESULTS",
        PricingStatus::Fallback => "FALLBACK",
        PricingStatus::Error => "ERROR",
        PricingStatus::Timeout => "TIMEOUT",
    }
}

fn confidence_label(confidence: PricingConfidence) -> &'static str {
    match confidence {
        PricingConfidence::High => "HIGH",
        PricingConfidence::Med => "MED",
        PricingConfidence::Low => "LOW",
    }
}

pub async fn estimate_v3(
    State(state): State<AppState>,
    Json(request): Json<V3Request>,
) -> ApiResult<Json<V3Response>> {
    if request.country_code.len() != 2 {
        return Err(ApiError::invalid_request("countryCode must be a 2-letter ISO code"));
    }

    let start = Instant::now();
    let llm = state.llm.as_deref().ok_or_else(|| ApiError::Disabled)?;
    let service = V3Service::new(llm, &state.v3_cache, &state.pricing_config);

    let cache_key = pricing_core::v3_cache_key(
        &request.brand,
        &request.product_type,
        request.model.as_deref(),
        request.condition.as_str(),
        &request.country_code,
    );
    let cached = state.v3_cache.get(&cache_key).is_some();

    let estimate = service
        .estimate(
            &request.brand,
            &request.product_type,
            request.model.as_deref(),
            request.condition.as_str(),
            &request.country_code,
        )
        .await?;

    Ok(Json(V3Response {
        success: true,
        pricing: V3PricingBody {
            status: "OK",
            country_code: request.country_code,
            marketplaces_used: Vec::new(),
            range: Some(RangeBody {
                low: estimate.low,
                median: (estimate.low + estimate.high) / 2.0,
                high: estimate.high,
                currency: estimate.currency,
            }),
            confidence: Some(match estimate.confidence.as_str() {
                "HIGH" => "HIGH",
                "LOW" => "LOW",
                _ => "MED",
            }),
            reason: Some(estimate.why),
            result_count: None,
        },
        cached,
        processing_time_ms: start.elapsed().as_millis() as u64,
        prompt_version: PROMPT_VERSION,
    }))
}

pub async fn estimate_v4(
    State(state): State<AppState>,
    Json(request): Json<V4Request>,
) -> ApiResult<Json<V4Response>> {
    if request.country_code.len() != 2 {
        return Err(ApiError::invalid_request("countryCode must be a 2-letter ISO code"));
    }

    let start = Instant::now();
    let service = V4Service::new(
        &state.pricing_config,
        &state.adapters,
        &state.catalog,
        &state.v4_cache,
        state.llm.as_deref(),
        &state.v3_cache,
    );

    let pricing_request = PricingRequest {
        item_id: request.item_id,
        brand: request.brand,
        product_type: request.product_type,
        model: request.model,
        condition: request.condition,
        country_code: request.country_code.clone(),
        preferred_marketplaces: request.preferred_marketplaces,
        variant_attributes: request.variant_attributes,
        completeness: request.completeness,
        identifier: request.identifier,
    };

    let attrs: Vec<(String, String)> = pricing_request
        .variant_attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let cache_key = pricing_core::v4_cache_key(
        &pricing_request.brand,
        &pricing_request.product_type,
        pricing_request.model.as_deref(),
        pricing_request.condition.as_str(),
        &pricing_request.country_code,
        &attrs,
        &pricing_request.completeness,
        pricing_request.identifier.as_deref(),
    );
    let cached = state.v4_cache.get(&cache_key).is_some();

    let insights = service.price(&pricing_request).await?;

    Ok(Json(V4Response {
        success: true,
        pricing: V4PricingBody {
            status: status_label(insights.status),
            country_code: request.country_code,
            sources: insights
                .sources
                .into_iter()
                .map(|s| SourceBody {
                    marketplace_id: s.marketplace_id,
                    listing_count: s.listing_count,
                })
                .collect(),
            total_listings_analyzed: insights.total_listings_analyzed,
            time_window_days: insights.time_window_days,
            range: insights.range.map(|r| RangeBody {
                low: r.low,
                median: r.median,
                high: r.high,
                currency: r.currency,
            }),
            sample_listings: insights
                .sample_listings
                .into_iter()
                .map(|l| ListingBody {
                    title: l.title,
                    price: l.price,
                    currency: l.currency,
                    url: l.url.unwrap_or_default(),
                })
                .collect(),
            confidence: confidence_label(insights.confidence),
            fallback_reason: insights.fallback_reason,
        },
        cached,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
