//! Application state.

use std::sync::Arc;

use pricing_core::{
    AdapterRegistry, BrandModelCatalog, CategoryCatalog, LlmClient, PricingCache, PricingConfig, V3Estimate,
};
use pricing_models::PricingInsights;

use crate::config::ApiConfig;

/// Shared application state, handed to every handler via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pricing_config: Arc<PricingConfig>,
    pub adapters: Arc<AdapterRegistry>,
    pub catalog: Arc<CategoryCatalog>,
    pub brand_catalog: Arc<BrandModelCatalog>,
    pub v4_cache: Arc<PricingCache<PricingInsights>>,
    pub v3_cache: Arc<PricingCache<V3Estimate>>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        pricing_config: PricingConfig,
        adapters: AdapterRegistry,
        catalog: CategoryCatalog,
        brand_catalog: BrandModelCatalog,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let v4_cache = Arc::new(PricingCache::new(pricing_config.cache_ttl));
        let v3_cache = Arc::new(PricingCache::new(pricing_config.cache_ttl));
        Self {
            config,
            pricing_config: Arc::new(pricing_config),
            adapters: Arc::new(adapters),
            catalog: Arc::new(catalog),
            brand_catalog: Arc::new(brand_catalog),
            v4_cache,
            v3_cache,
            llm,
        }
    }

    /// Spawns the background task that periodically sweeps expired cache
    /// entries (§10.3, janitor_interval).
    pub fn spawn_cache_janitor(&self) {
        let interval = self.pricing_config.janitor_interval;
        let v4_cache = Arc::clone(&self.v4_cache);
        let v3_cache = Arc::clone(&self.v3_cache);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed_v4 = v4_cache.sweep_expired();
                let removed_v3 = v3_cache.sweep_expired();
                if removed_v4 > 0 || removed_v3 > 0 {
                    tracing::debug!(removed_v4, removed_v3, "cache janitor swept expired entries");
                }
            }
        });
    }
}
