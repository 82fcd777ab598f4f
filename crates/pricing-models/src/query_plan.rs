use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Filters chosen from the closed set the query-plan builder draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFilter {
    ExcludeParts,
    ExcludeBundles,
}

/// Post-filter rules applied after listings are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostFilterRule {
    ExcludeAccessoryLike,
}

/// Per-request telemetry the builder records while resolving a query plan,
/// surfaced to callers for diagnostics rather than the HTTP response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPlanTelemetry {
    pub warnings: Vec<String>,
}

/// Deterministic, per-marketplace query derived from an item tuple (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub q: String,
    pub category_id: Option<String>,
    pub filters: Vec<QueryFilter>,
    pub post_filter_rules: Vec<PostFilterRule>,
    pub telemetry: QueryPlanTelemetry,
}

/// The item-tuple input to the query-plan builder.
#[derive(Debug, Clone)]
pub struct QueryPlanInput {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub subtype: String,
    pub identifier: Option<String>,
    pub variant_attributes: BTreeMap<String, String>,
    pub completeness: Vec<String>,
    pub marketplace_id: String,
}
