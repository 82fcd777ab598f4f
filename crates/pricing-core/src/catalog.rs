//! Brand/model catalog backing `/v1/catalog/{subtype}/brands` and
//! `/v1/catalog/{subtype}/models` (§6). Loaded once at startup from the
//! same persisted-config JSON the category catalog comes from; no runtime
//! reload except via explicit reinit.

use std::collections::BTreeMap;

/// Keyed by normalized subtype, then by brand, holding that brand's known
/// models for the subtype.
#[derive(Debug, Clone, Default)]
pub struct BrandModelCatalog {
    by_subtype: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl BrandModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subtype: &str, brand: &str, models: Vec<String>) {
        let mut models = models;
        models.sort();
        models.dedup();
        self.by_subtype
            .entry(normalize(subtype))
            .or_default()
            .insert(brand.to_string(), models);
    }

    /// Alphabetical brand list for a subtype, empty if the subtype is unknown.
    pub fn brands(&self, subtype: &str) -> Vec<String> {
        self.by_subtype
            .get(&normalize(subtype))
            .map(|brands| {
                let mut names: Vec<String> = brands.keys().cloned().collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    /// Alphabetical model list for a (subtype, brand) pair, empty if unknown.
    pub fn models(&self, subtype: &str, brand: &str) -> Vec<String> {
        self.by_subtype
            .get(&normalize(subtype))
            .and_then(|brands| brands.get(brand))
            .cloned()
            .unwrap_or_default()
    }
}

fn normalize(subtype: &str) -> String {
    subtype.trim().to_lowercase()
}
