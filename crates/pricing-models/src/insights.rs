use serde::{Deserialize, Serialize};

use crate::listing::{FetchedListing, MatchConfidence};

/// Outcome of a V4 pricing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingStatus {
    Ok,
    NoResults,
    Fallback,
    Error,
    Timeout,
}

/// Overall confidence in the returned range, driven by sample size and
/// noise ratio (§4.10 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PricingConfidence {
    High,
    Med,
    Low,
}

/// The verifiable (p25, median, p75) range, together with its currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: f64,
    pub median: f64,
    pub high: f64,
    pub currency: String,
}

/// Per-marketplace contribution to the final range, surfaced so the
/// response can name `sources[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSource {
    pub marketplace_id: String,
    pub listing_count: usize,
}

/// Full result of a V4 pricing request, independent of HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingInsights {
    pub status: PricingStatus,
    pub sources: Vec<PricingSource>,
    pub total_listings_analyzed: usize,
    pub time_window_days: u32,
    pub range: Option<PriceRange>,
    pub sample_listings: Vec<FetchedListing>,
    pub confidence: PricingConfidence,
    pub fallback_reason: Option<String>,
}

impl PricingInsights {
    /// `range` must be present unless the status says there was nothing (or
    /// nothing usable) to compute it from.
    pub fn invariant_holds(&self) -> bool {
        let range_forbidden = matches!(
            self.status,
            PricingStatus::NoResults | PricingStatus::Error | PricingStatus::Timeout
        );
        if range_forbidden {
            self.range.is_none()
        } else {
            self.range.is_some()
        }
    }
}

/// Ad-hoc match-confidence tally used while building a `PricingInsights`
/// (e.g. to decide `noiseRatio`).
#[derive(Debug, Clone, Default)]
pub struct MatchTally {
    pub high: usize,
    pub med: usize,
    pub low: usize,
}

impl MatchTally {
    pub fn record(&mut self, confidence: MatchConfidence) {
        match confidence {
            MatchConfidence::High => self.high += 1,
            MatchConfidence::Med => self.med += 1,
            MatchConfidence::Low => self.low += 1,
        }
    }
}
