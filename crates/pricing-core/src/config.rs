//! Single immutable configuration record for the pricing core.

use std::env;
use std::time::Duration;

use regex::Regex;

/// Thresholds and toggles the pricing core needs at construction. Loaded
/// via `from_env()` in the same style as the scan side's `ScanConfig`.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub disabled: bool,
    /// Per-adapter fetch timeout (design 5s).
    pub adapter_timeout: Duration,
    /// Overall V4 request timeout, including the AI clusterer call (design 20s).
    pub overall_timeout: Duration,
    /// noiseRatio threshold above which the AI clusterer is invoked (design 0.3).
    pub ai_clustering_noise_threshold: f64,
    pub ai_clustering_enabled: bool,
    /// Cache TTL for both V4 and V3 results (design 24h).
    pub cache_ttl: Duration,
    pub fallback_to_v3_enabled: bool,
    /// Patterns used by `exclude_accessory_like`; domain-driven, so they are
    /// config rather than hard-coded (§9 open question).
    pub accessory_patterns: Vec<Regex>,
    /// How often the cache janitor sweeps expired entries (design 5 min).
    pub janitor_interval: Duration,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            adapter_timeout: Duration::from_secs(5),
            overall_timeout: Duration::from_secs(20),
            ai_clustering_noise_threshold: 0.3,
            ai_clustering_enabled: true,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            fallback_to_v3_enabled: true,
            accessory_patterns: default_accessory_patterns(),
            janitor_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = env::var("PRICING_DISABLED") {
            config.disabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = env::var("PRICING_ADAPTER_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                config.adapter_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = env::var("PRICING_FALLBACK_TO_V3") {
            config.fallback_to_v3_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = env::var("PRICING_AI_CLUSTERING_ENABLED") {
            config.ai_clustering_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }

        config
    }
}

fn default_accessory_patterns() -> Vec<Regex> {
    [
        r"(?i)\bcase\b",
        r"(?i)\bcover\b",
        r"(?i)\bcable\b",
        r"(?i)\bcharger\b",
        r"(?i)\bscreen protector\b",
        r"(?i)\breplacement part\b",
        r"(?i)\bfor parts\b",
        r"(?i)\bbundle\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
}
