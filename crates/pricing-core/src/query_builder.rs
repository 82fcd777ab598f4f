//! Turns a (brand, model, subtype, condition) tuple into marketplace
//! queries + filters (§4.9). Pure and deterministic.

use std::collections::BTreeMap;

use pricing_models::{PostFilterRule, QueryFilter, QueryPlan, QueryPlanInput, QueryPlanTelemetry};

/// Maps normalized subtype → marketplace category id, e.g. eBay's `sacat`.
/// Loaded once at `PricingCore` construction (§11) from catalog JSON.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    /// Keyed by `(marketplace_id, normalized_subtype)`.
    by_marketplace_subtype: BTreeMap<(String, String), String>,
}

impl CategoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marketplace_id: &str, subtype: &str, category_id: &str) {
        self.by_marketplace_subtype.insert(
            (marketplace_id.to_string(), normalize_subtype(subtype)),
            category_id.to_string(),
        );
    }

    pub fn resolve(&self, marketplace_id: &str, subtype: &str) -> Option<&str> {
        self.by_marketplace_subtype
            .get(&(marketplace_id.to_string(), normalize_subtype(subtype)))
            .map(|s| s.as_str())
    }
}

fn normalize_subtype(subtype: &str) -> String {
    subtype.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct QueryPlanBuilder;

impl QueryPlanBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, input: &QueryPlanInput, catalog: &CategoryCatalog) -> QueryPlan {
        let mut telemetry = QueryPlanTelemetry::default();

        let q = self.build_query_text(input);

        let category_id = match catalog.resolve(&input.marketplace_id, &input.subtype) {
            Some(id) => Some(id.to_string()),
            None => {
                telemetry.warnings.push(format!(
                    "no category mapping for marketplace '{}' subtype '{}'",
                    input.marketplace_id, input.subtype
                ));
                None
            }
        };

        QueryPlan {
            q,
            category_id,
            filters: vec![QueryFilter::ExcludeParts, QueryFilter::ExcludeBundles],
            post_filter_rules: vec![PostFilterRule::ExcludeAccessoryLike],
            telemetry,
        }
    }

    fn build_query_text(&self, input: &QueryPlanInput) -> String {
        let brand = input.brand.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let model = input.model.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if brand.is_none() && model.is_none() {
            if let Some(identifier) = &input.identifier {
                return identifier.trim().to_string();
            }
            return String::new();
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(b) = brand {
            parts.push(b.to_string());
        }
        if let Some(m) = model {
            parts.push(m.to_string());
        }
        for value in input.variant_attributes.values() {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }

        parts.sort();
        parts.dedup();
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> QueryPlanInput {
        QueryPlanInput {
            brand: Some("Apple".to_string()),
            model: Some("iPhone 13".to_string()),
            subtype: "electronics_smartphone".to_string(),
            identifier: None,
            variant_attributes: BTreeMap::new(),
            completeness: Vec::new(),
            marketplace_id: "ebay".to_string(),
        }
    }

    #[test]
    fn q_combines_brand_and_model_sorted() {
        let builder = QueryPlanBuilder::new();
        let catalog = CategoryCatalog::new();
        let plan = builder.build(&input(), &catalog);
        assert_eq!(plan.q, "Apple iPhone 13");
    }

    #[test]
    fn missing_category_mapping_records_warning_and_omits_id() {
        let builder = QueryPlanBuilder::new();
        let catalog = CategoryCatalog::new();
        let plan = builder.build(&input(), &catalog);
        assert!(plan.category_id.is_none());
        assert_eq!(plan.telemetry.warnings.len(), 1);
    }

    #[test]
    fn resolved_category_mapping_is_used() {
        let builder = QueryPlanBuilder::new();
        let mut catalog = CategoryCatalog::new();
        catalog.insert("ebay", "electronics_smartphone", "9355");
        let plan = builder.build(&input(), &catalog);
        assert_eq!(plan.category_id.as_deref(), Some("9355"));
        assert!(plan.telemetry.warnings.is_empty());
    }

    #[test]
    fn is_deterministic_for_the_same_input() {
        let builder = QueryPlanBuilder::new();
        let catalog = CategoryCatalog::new();
        let a = builder.build(&input(), &catalog);
        let b = builder.build(&input(), &catalog);
        assert_eq!(a.q, b.q);
        assert_eq!(a.category_id, b.category_id);
    }

    #[test]
    fn falls_back_to_identifier_when_brand_and_model_absent() {
        let builder = QueryPlanBuilder::new();
        let catalog = CategoryCatalog::new();
        let mut plan_input = input();
        plan_input.brand = None;
        plan_input.model = None;
        plan_input.identifier = Some("EAN-1234567890".to_string());
        let plan = builder.build(&plan_input, &catalog);
        assert_eq!(plan.q, "EAN-1234567890");
    }
}
