//! Removes accessories/parts/bundles per query plan (§4.10 step 4).

use pricing_models::{FetchedListing, PostFilterRule, QueryFilter, QueryPlan};
use regex::Regex;

/// Applies a query plan's pre-filters (keyword heuristics on title) and
/// post-filter rules (regex-based accessory exclusion) to a batch of
/// fetched listings.
pub struct ListingFilter<'a> {
    accessory_patterns: &'a [Regex],
}

impl<'a> ListingFilter<'a> {
    pub fn new(accessory_patterns: &'a [Regex]) -> Self {
        Self { accessory_patterns }
    }

    pub fn apply(&self, plan: &QueryPlan, listings: Vec<FetchedListing>) -> Vec<FetchedListing> {
        listings
            .into_iter()
            .filter(|listing| self.passes_pre_filters(plan, listing))
            .filter(|listing| self.passes_post_filter_rules(plan, listing))
            .collect()
    }

    fn passes_pre_filters(&self, plan: &QueryPlan, listing: &FetchedListing) -> bool {
        let title_lower = listing.title.to_lowercase();

        if plan.filters.contains(&QueryFilter::ExcludeParts)
            && (title_lower.contains("for parts") || title_lower.contains("spares or repair"))
        {
            return false;
        }

        if plan.filters.contains(&QueryFilter::ExcludeBundles)
            && (title_lower.contains("bundle") || title_lower.contains("lot of"))
        {
            return false;
        }

        true
    }

    fn passes_post_filter_rules(&self, plan: &QueryPlan, listing: &FetchedListing) -> bool {
        if !plan.post_filter_rules.contains(&PostFilterRule::ExcludeAccessoryLike) {
            return true;
        }

        !self
            .accessory_patterns
            .iter()
            .any(|pattern| pattern.is_match(&listing.title))
    }
}

/// `(totalFetched - surviving) / totalFetched`, the signal that decides
/// whether the AI clusterer is worth invoking (§4.10 step 5).
pub fn noise_ratio(total_fetched: usize, surviving: usize) -> f64 {
    if total_fetched == 0 {
        0.0
    } else {
        (total_fetched.saturating_sub(surviving)) as f64 / total_fetched as f64
    }
}
