//! Glue, cache, and fallback-to-V3 policy for the full pricing request
//! (§4.10).

use std::collections::BTreeMap;

use pricing_models::{
    Condition, FetchedListing, MatchConfidence, NormalizedListing, PriceRange, PricingConfidence,
    PricingInsights, PricingSource, PricingStatus, QueryPlanInput,
};

use crate::adapter::{AdapterOutcome, AdapterRegistry, ListingQuery};
use crate::aggregator::{aggregate, confidence_for};
use crate::cache::{v4_cache_key, PricingCache};
use crate::config::PricingConfig;
use crate::error::{PricingError, PricingResult};
use crate::filter::{noise_ratio, ListingFilter};
use crate::llm::LlmClient;
use crate::query_builder::{CategoryCatalog, QueryPlanBuilder};
use crate::v3_service::{V3Estimate, V3Service};

const DEFAULT_TIME_WINDOW_DAYS: u32 = 90;
const MAX_SAMPLE_LISTINGS: usize = 3;

/// Everything a V4 request needs (§6 `/v1/pricing/v4` body).
#[derive(Debug, Clone)]
pub struct PricingRequest {
    pub item_id: String,
    pub brand: String,
    pub product_type: String,
    pub model: Option<String>,
    pub condition: Condition,
    pub country_code: String,
    pub preferred_marketplaces: Vec<String>,
    pub variant_attributes: BTreeMap<String, String>,
    pub completeness: Vec<String>,
    pub identifier: Option<String>,
}

pub struct V4Service<'a> {
    config: &'a PricingConfig,
    adapters: &'a AdapterRegistry,
    catalog: &'a CategoryCatalog,
    query_builder: QueryPlanBuilder,
    cache: &'a PricingCache<PricingInsights>,
    llm: Option<&'a dyn LlmClient>,
    v3_cache: &'a PricingCache<V3Estimate>,
}

impl<'a> V4Service<'a> {
    pub fn new(
        config: &'a PricingConfig,
        adapters: &'a AdapterRegistry,
        catalog: &'a CategoryCatalog,
        cache: &'a PricingCache<PricingInsights>,
        llm: Option<&'a dyn LlmClient>,
        v3_cache: &'a PricingCache<V3Estimate>,
    ) -> Self {
        Self {
            config,
            adapters,
            catalog,
            query_builder: QueryPlanBuilder::new(),
            cache,
            llm,
            v3_cache,
        }
    }

    pub async fn price(&self, request: &PricingRequest) -> PricingResult<PricingInsights> {
        if self.config.disabled {
            return Err(PricingError::Disabled);
        }

        let cache_key = self.cache_key(request);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let insights = tokio::time::timeout(self.config.overall_timeout, self.price_uncached(request))
            .await
            .map_err(|_| PricingError::Timeout)??;

        self.cache.insert(cache_key, insights.clone());
        Ok(insights)
    }

    fn cache_key(&self, request: &PricingRequest) -> String {
        let attrs: Vec<(String, String)> = request
            .variant_attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        v4_cache_key(
            &request.brand,
            &request.product_type,
            request.model.as_deref(),
            request.condition.as_str(),
            &request.country_code,
            &attrs,
            &request.completeness,
            request.identifier.as_deref(),
        )
    }

    async fn price_uncached(&self, request: &PricingRequest) -> PricingResult<PricingInsights> {
        let plan_input = QueryPlanInput {
            brand: Some(request.brand.clone()),
            model: request.model.clone(),
            subtype: request.product_type.clone(),
            identifier: request.identifier.clone(),
            variant_attributes: request.variant_attributes.clone(),
            completeness: request.completeness.clone(),
            marketplace_id: "default".to_string(),
        };
        let plan = self.query_builder.build(&plan_input, self.catalog);

        let query = ListingQuery {
            q: plan.q.clone(),
            brand: Some(request.brand.clone()),
            model: request.model.clone(),
            product_type: request.product_type.clone(),
            condition: Some(request.condition.as_str().to_string()),
            country_code: request.country_code.clone(),
            category_id: plan.category_id.clone(),
            max_results: 50,
        };

        let outcomes = self.adapters.fetch_all(&query, self.config.adapter_timeout).await;

        let mut all_listings: Vec<FetchedListing> = Vec::new();
        let mut sources: Vec<PricingSource> = Vec::new();
        let mut any_success = false;

        for (adapter_id, outcome) in &outcomes {
            match outcome {
                AdapterOutcome::Success(listings) => {
                    any_success = true;
                    sources.push(PricingSource {
                        marketplace_id: adapter_id.clone(),
                        listing_count: listings.len(),
                    });
                    all_listings.extend(listings.iter().cloned());
                    metrics::counter!("pricing_adapter_requests_total", "adapter" => adapter_id.clone(), "status" => "success").increment(1);
                }
                AdapterOutcome::Error(_) => {
                    metrics::counter!("pricing_adapter_requests_total", "adapter" => adapter_id.clone(), "status" => "error").increment(1);
                }
                AdapterOutcome::Timeout => {
                    metrics::counter!("pricing_adapter_requests_total", "adapter" => adapter_id.clone(), "status" => "timeout").increment(1);
                }
                AdapterOutcome::CircuitOpen => {
                    metrics::counter!("pricing_adapter_requests_total", "adapter" => adapter_id.clone(), "status" => "circuit_open").increment(1);
                }
            }
        }

        if !any_success {
            return self.fallback_or_no_results(request, "all adapters failed or timed out").await;
        }

        let total_fetched = all_listings.len();
        let filter = ListingFilter::new(&self.config.accessory_patterns);
        let survivors = filter.apply(&plan, all_listings);
        let noise = noise_ratio(total_fetched, survivors.len());

        let normalized: Vec<NormalizedListing> = if self.config.ai_clustering_enabled
            && noise > self.config.ai_clustering_noise_threshold
            && self.llm.is_some()
        {
            let clusterer = crate::clusterer::AiClusterer::new(self.llm.unwrap());
            clusterer.classify(&plan.q, &survivors).await
        } else {
            survivors
                .into_iter()
                .map(|listing| NormalizedListing {
                    match_confidence: MatchConfidence::High,
                    normalized_condition: listing.condition,
                    listing,
                })
                .collect()
        };

        let used: Vec<NormalizedListing> = normalized
            .into_iter()
            .filter(|listing| listing.survives_default_filter())
            .collect();

        if used.is_empty() {
            return Ok(PricingInsights {
                status: PricingStatus::NoResults,
                sources,
                total_listings_analyzed: total_fetched,
                time_window_days: DEFAULT_TIME_WINDOW_DAYS,
                range: None,
                sample_listings: Vec::new(),
                confidence: PricingConfidence::Low,
                fallback_reason: None,
            });
        }

        let range = aggregate(&used);
        let confidence = confidence_for(used.len(), noise);
        let sample_listings = pick_sample_listings(&used);

        Ok(PricingInsights {
            status: PricingStatus::Ok,
            sources,
            total_listings_analyzed: total_fetched,
            time_window_days: DEFAULT_TIME_WINDOW_DAYS,
            range,
            sample_listings,
            confidence,
            fallback_reason: None,
        })
    }

    async fn fallback_or_no_results(
        &self,
        request: &PricingRequest,
        reason: &str,
    ) -> PricingResult<PricingInsights> {
        if !self.config.fallback_to_v3_enabled {
            return Ok(PricingInsights {
                status: PricingStatus::NoResults,
                sources: Vec::new(),
                total_listings_analyzed: 0,
                time_window_days: DEFAULT_TIME_WINDOW_DAYS,
                range: None,
                sample_listings: Vec::new(),
                confidence: PricingConfidence::Low,
                fallback_reason: None,
            });
        }

        let Some(llm) = self.llm else {
            return Ok(PricingInsights {
                status: PricingStatus::NoResults,
                sources: Vec::new(),
                total_listings_analyzed: 0,
                time_window_days: DEFAULT_TIME_WINDOW_DAYS,
                range: None,
                sample_listings: Vec::new(),
                confidence: PricingConfidence::Low,
                fallback_reason: None,
            });
        };

        let v3 = V3Service::new(llm, self.v3_cache, self.config);
        match v3
            .estimate(
                &request.brand,
                &request.product_type,
                request.model.as_deref(),
                request.condition.as_str(),
                &request.country_code,
            )
            .await
        {
            Ok(estimate) => Ok(PricingInsights {
                status: PricingStatus::Fallback,
                sources: Vec::new(),
                total_listings_analyzed: 0,
                time_window_days: DEFAULT_TIME_WINDOW_DAYS,
                range: Some(PriceRange {
                    low: estimate.low,
                    median: (estimate.low + estimate.high) / 2.0,
                    high: estimate.high,
                    currency: estimate.currency,
                }),
                sample_listings: Vec::new(),
                confidence: PricingConfidence::Low,
                fallback_reason: Some(format!("{reason}; V3 single-shot estimate used")),
            }),
            Err(PricingError::Timeout) => Err(PricingError::Timeout),
            Err(_) => Ok(PricingInsights {
                status: PricingStatus::NoResults,
                sources: Vec::new(),
                total_listings_analyzed: 0,
                time_window_days: DEFAULT_TIME_WINDOW_DAYS,
                range: None,
                sample_listings: Vec::new(),
                confidence: PricingConfidence::Low,
                fallback_reason: None,
            }),
        }
    }
}

/// Up to 3 sample listings, preferring one per distinct normalized
/// condition (§4.10 step 10).
fn pick_sample_listings(used: &[NormalizedListing]) -> Vec<FetchedListing> {
    let mut picked = Vec::new();
    let mut seen_conditions = std::collections::HashSet::new();

    for listing in used {
        if picked.len() >= MAX_SAMPLE_LISTINGS {
            break;
        }
        if seen_conditions.insert(listing.normalized_condition) {
            picked.push(listing.listing.clone());
        }
    }

    if picked.len() < MAX_SAMPLE_LISTINGS {
        for listing in used {
            if picked.len() >= MAX_SAMPLE_LISTINGS {
                break;
            }
            if !picked.iter().any(|p| p.title == listing.listing.title) {
                picked.push(listing.listing.clone());
            }
        }
    }

    picked
}
