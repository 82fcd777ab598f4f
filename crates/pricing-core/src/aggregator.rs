//! Produces (p25, median, p75) with currency selection (§4.10 steps 6-7).

use std::collections::HashMap;

use pricing_models::{NormalizedListing, PriceRange, PricingConfidence};

/// Nearest-rank percentile over a sorted slice, matching the simple,
/// deterministic definition the seed scenarios rely on (S4: median of two
/// listings at 120/140 is 130).
fn percentile(sorted_prices: &[f64], p: f64) -> f64 {
    if sorted_prices.is_empty() {
        return 0.0;
    }
    if sorted_prices.len() == 1 {
        return sorted_prices[0];
    }
    let rank = p * (sorted_prices.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted_prices[lower]
    } else {
        let weight = rank - lower as f64;
        sorted_prices[lower] * (1.0 - weight) + sorted_prices[upper] * weight
    }
}

/// Aggregates a cohort of normalized listings into a verifiable range, or
/// `None` if nothing survives.
pub fn aggregate(listings: &[NormalizedListing]) -> Option<PriceRange> {
    if listings.is_empty() {
        return None;
    }

    let mut prices: Vec<f64> = listings.iter().map(|l| l.listing.price).collect();
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let low = percentile(&prices, 0.25);
    let median = percentile(&prices, 0.5);
    let high = percentile(&prices, 0.75);

    Some(PriceRange {
        low,
        median,
        high,
        currency: mode_currency(listings),
    })
}

/// Currency is the statistical mode of survivors, tie-broken by the first
/// listing's currency, with `"EUR"` as the final fallback (§9, §12).
fn mode_currency(listings: &[NormalizedListing]) -> String {
    if listings.is_empty() {
        return "EUR".to_string();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for listing in listings {
        *counts.entry(listing.listing.currency.as_str()).or_insert(0) += 1;
    }

    let max_count = counts.values().copied().max().unwrap_or(0);
    let first_currency = listings[0].listing.currency.as_str();

    // Prefer the first listing's currency among those tied for the max
    // count, so the tie-break is stable rather than HashMap-order-dependent.
    if counts.get(first_currency).copied().unwrap_or(0) == max_count {
        return first_currency.to_string();
    }

    listings
        .iter()
        .map(|l| l.listing.currency.as_str())
        .find(|currency| counts.get(currency).copied().unwrap_or(0) == max_count)
        .unwrap_or("EUR")
        .to_string()
}

/// Confidence per §4.10 step 7: sampleSize ≥ 10 ∧ noiseRatio < 0.3 → HIGH;
/// sampleSize ≥ 5 → MED; else LOW.
pub fn confidence_for(sample_size: usize, noise_ratio: f64) -> PricingConfidence {
    if sample_size >= 10 && noise_ratio < 0.3 {
        PricingConfidence::High
    } else if sample_size >= 5 {
        PricingConfidence::Med
    } else {
        PricingConfidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricing_models::{FetchedListing, MatchConfidence};

    fn normalized(price: f64, currency: &str) -> NormalizedListing {
        NormalizedListing {
            listing: FetchedListing {
                title: "iPhone 13".to_string(),
                price,
                currency: currency.to_string(),
                condition: None,
                source_marketplace_id: "ebay".to_string(),
                url: None,
            },
            match_confidence: MatchConfidence::High,
            normalized_condition: None,
        }
    }

    #[test]
    fn two_listing_median_matches_seed_scenario_s4() {
        let listings = vec![normalized(120.0, "EUR"), normalized(140.0, "EUR")];
        let range = aggregate(&listings).unwrap();
        assert_eq!(range.median, 130.0);
        assert_eq!(range.currency, "EUR");
    }

    #[test]
    fn percentiles_are_ordered() {
        let listings = vec![
            normalized(50.0, "EUR"),
            normalized(80.0, "EUR"),
            normalized(100.0, "EUR"),
            normalized(120.0, "EUR"),
            normalized(200.0, "EUR"),
        ];
        let range = aggregate(&listings).unwrap();
        assert!(range.low <= range.median);
        assert!(range.median <= range.high);
    }

    #[test]
    fn duplicates_do_not_change_percentiles() {
        let without_dupes = vec![normalized(100.0, "EUR"), normalized(200.0, "EUR")];
        let with_dupes = vec![
            normalized(100.0, "EUR"),
            normalized(100.0, "EUR"),
            normalized(200.0, "EUR"),
            normalized(200.0, "EUR"),
        ];
        let a = aggregate(&without_dupes).unwrap();
        let b = aggregate(&with_dupes).unwrap();
        assert_eq!(a.median, b.median);
    }

    #[test]
    fn mixed_currency_picks_the_mode() {
        let listings = vec![
            normalized(100.0, "EUR"),
            normalized(110.0, "EUR"),
            normalized(90.0, "USD"),
        ];
        let range = aggregate(&listings).unwrap();
        assert_eq!(range.currency, "EUR");
    }

    #[test]
    fn tie_break_prefers_first_listing_currency() {
        let listings = vec![normalized(100.0, "USD"), normalized(110.0, "EUR")];
        let range = aggregate(&listings).unwrap();
        assert_eq!(range.currency, "USD");
    }

    #[test]
    fn confidence_thresholds_match_spec() {
        assert_eq!(confidence_for(12, 0.1), PricingConfidence::High);
        assert_eq!(confidence_for(12, 0.5), PricingConfidence::Med);
        assert_eq!(confidence_for(6, 0.0), PricingConfidence::Med);
        assert_eq!(confidence_for(2, 0.0), PricingConfidence::Low);
    }
}
