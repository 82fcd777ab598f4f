//! Deterministic, single in-process cache for V3/V4 results, with a janitor
//! that sweeps expired entries (§4.10 step 2, §5 "Pricing pipeline").

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Guarded by a single mutex: the spec calls for single-threaded access to
/// one in-process map, not a concurrent cache.
pub struct PricingCache<V: Clone> {
    entries: Mutex<BTreeMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> PricingCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Removes every entry whose TTL has elapsed. Called periodically by
    /// the janitor task the host schedules every `janitor_interval`.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a deterministic cache key, normalizing case/whitespace/attribute
/// order so two requests differing only by those hash identically
/// (§8 invariant 6, S6).
pub fn v4_cache_key(
    brand: &str,
    product_type: &str,
    model: Option<&str>,
    condition: &str,
    country_code: &str,
    variant_attributes: &[(String, String)],
    completeness: &[String],
    identifier: Option<&str>,
) -> String {
    let mut sorted_attrs: Vec<(String, String)> = variant_attributes
        .iter()
        .map(|(k, v)| (normalize_component(k), normalize_component(v)))
        .collect();
    sorted_attrs.sort();

    let mut sorted_completeness: Vec<String> = completeness.iter().map(|c| normalize_component(c)).collect();
    sorted_completeness.sort();

    let components = [
        normalize_component(brand),
        normalize_component(product_type),
        normalize_component(model.unwrap_or("")),
        normalize_component(condition),
        normalize_component(country_code),
        sorted_attrs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(","),
        sorted_completeness.join(","),
        normalize_component(identifier.unwrap_or("")),
    ];

    hash_components(&components)
}

/// Same normalization/hash shape as `v4_cache_key`, scoped to V3's smaller
/// input tuple (§4.11).
pub fn v3_cache_key(brand: &str, product_type: &str, model: Option<&str>, condition: &str, country_code: &str) -> String {
    let components = [
        normalize_component(brand),
        normalize_component(product_type),
        normalize_component(model.unwrap_or("")),
        normalize_component(condition),
        normalize_component(country_code),
    ];
    hash_components(&components)
}

fn normalize_component(value: &str) -> String {
    value.trim().to_lowercase()
}

fn hash_components(components: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(components.join("|").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_normalizes_case_and_whitespace() {
        let a = v4_cache_key("  APPLE ", "electronics_smartphone", Some("iPhone 13"), "GOOD", "NL", &[], &[], None);
        let b = v4_cache_key("apple", "electronics_smartphone", Some("iphone 13"), "good", "nl", &[], &[], None);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_is_order_independent_for_variant_attributes() {
        let attrs_a = vec![("color".to_string(), "blue".to_string()), ("storage".to_string(), "128gb".to_string())];
        let attrs_b = vec![("storage".to_string(), "128gb".to_string()), ("color".to_string(), "blue".to_string())];
        let a = v4_cache_key("apple", "electronics_smartphone", Some("iphone 13"), "good", "nl", &attrs_a, &[], None);
        let b = v4_cache_key("apple", "electronics_smartphone", Some("iphone 13"), "good", "nl", &attrs_b, &[], None);
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_hash_differently() {
        let a = v3_cache_key("apple", "electronics_smartphone", Some("iphone 13"), "good", "nl");
        let b = v3_cache_key("apple", "electronics_smartphone", Some("iphone 14"), "good", "nl");
        assert_ne!(a, b);
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache: PricingCache<u32> = PricingCache::new(Duration::from_millis(5));
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(10));
        cache.insert("b".to_string(), 2);
        let removed = cache.sweep_expired();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
    }
}
