use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// A listing exactly as a marketplace adapter returned it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedListing {
    pub title: String,
    /// Price in the units the adapter natively returns (minor or major,
    /// consistent within one adapter).
    pub price: f64,
    pub currency: String,
    pub condition: Option<Condition>,
    pub source_marketplace_id: String,
    pub url: Option<String>,
}

impl FetchedListing {
    pub fn is_valid(&self) -> bool {
        self.price > 0.0 && self.currency.len() == 3
    }
}

/// Confidence the AI clusterer assigns a listing's match to the requested
/// item. Only HIGH/MED are used in aggregation by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchConfidence {
    High,
    Med,
    Low,
}

/// A `FetchedListing` augmented with the clusterer's (or the default
/// pass-through) match confidence and normalized condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedListing {
    #[serde(flatten)]
    pub listing: FetchedListing,
    pub match_confidence: MatchConfidence,
    pub normalized_condition: Option<Condition>,
}

impl NormalizedListing {
    pub fn survives_default_filter(&self) -> bool {
        matches!(self.match_confidence, MatchConfidence::High | MatchConfidence::Med)
    }
}
