//! Single-shot LLM price estimator, used directly and as the V4 fallback
//! (§4.11).

use serde::Deserialize;

use crate::cache::{v3_cache_key, PricingCache};
use crate::config::PricingConfig;
use crate::error::{PricingError, PricingResult};
use crate::llm::{strip_json_fences, LlmClient};

const MAX_WHY_CHARS: usize = 200;

/// Raw `{low, high, cur, conf, why}` estimate from the LLM.
#[derive(Debug, Clone)]
pub struct V3Estimate {
    pub low: f64,
    pub high: f64,
    pub currency: String,
    pub confidence: String,
    pub why: String,
}

#[derive(Debug, Deserialize)]
struct V3Response {
    low: f64,
    high: f64,
    cur: String,
    conf: String,
    why: String,
}

pub struct V3Service<'a> {
    llm: &'a dyn LlmClient,
    cache: &'a PricingCache<V3Estimate>,
    config: &'a PricingConfig,
}

impl<'a> V3Service<'a> {
    pub fn new(llm: &'a dyn LlmClient, cache: &'a PricingCache<V3Estimate>, config: &'a PricingConfig) -> Self {
        Self { llm, cache, config }
    }

    pub async fn estimate(
        &self,
        brand: &str,
        product_type: &str,
        model: Option<&str>,
        condition: &str,
        country_code: &str,
    ) -> PricingResult<V3Estimate> {
        if self.config.disabled {
            return Err(PricingError::Disabled);
        }

        let key = v3_cache_key(brand, product_type, model, condition, country_code);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let prompt = build_prompt(brand, product_type, model, condition, country_code);
        let raw = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|err| map_llm_error(err))?;

        let estimate = parse_response(&raw)?;
        self.cache.insert(key, estimate.clone());
        Ok(estimate)
    }
}

/// Token-budgeted prompt (≤ ~250 tokens); kept short and structured so the
/// model reliably returns the exact JSON shape we parse.
fn build_prompt(brand: &str, product_type: &str, model: Option<&str>, condition: &str, country_code: &str) -> String {
    let model_part = model.map(|m| format!(" {m}")).unwrap_or_default();
    format!(
        "Estimate a fair resale price range in {country_code} for a {condition} condition \
         {brand}{model_part} ({product_type}). Respond with JSON only: \
         {{\"low\":number,\"high\":number,\"cur\":\"ISO4217\",\"conf\":\"HIGH|MED|LOW\",\"why\":string}}"
    )
}

fn parse_response(raw: &str) -> PricingResult<V3Estimate> {
    let json = strip_json_fences(raw);
    let parsed: V3Response =
        serde_json::from_str(json).map_err(|e| PricingError::ValidationError(e.to_string()))?;

    if !(parsed.low > 0.0 && parsed.low <= parsed.high) {
        return Err(PricingError::ValidationError(format!(
            "invalid range: low={} high={}",
            parsed.low, parsed.high
        )));
    }

    let why = parsed.why;
    let why = if why.chars().count() > MAX_WHY_CHARS {
        why.chars().take(MAX_WHY_CHARS).collect()
    } else {
        why
    };

    Ok(V3Estimate {
        low: parsed.low,
        high: parsed.high,
        currency: parsed.cur,
        confidence: parsed.conf,
        why,
    })
}

/// Maps a raw LLM-transport error onto the V3 failure taxonomy (§4.11):
/// timeout → TIMEOUT; rate-limit substring → RATE_LIMITED; anything else →
/// ERROR (validation errors are already mapped at the parse site above).
fn map_llm_error(err: PricingError) -> PricingError {
    let message = err.to_string();
    if message.to_lowercase().contains("timeout") || message.to_lowercase().contains("timed out") {
        PricingError::Timeout
    } else if message.to_lowercase().contains("rate limit") {
        PricingError::RateLimited
    } else {
        PricingError::Internal(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubLlm {
        response: Result<String, String>,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, _prompt: &str) -> PricingResult<String> {
            self.response
                .clone()
                .map_err(|message| PricingError::Internal(message))
        }
    }

    #[tokio::test]
    async fn parses_valid_estimate_and_clamps_why() {
        let long_why = "x".repeat(300);
        let llm = StubLlm {
            response: Ok(format!(
                "{{\"low\":100,\"high\":200,\"cur\":\"EUR\",\"conf\":\"MED\",\"why\":\"{long_why}\"}}"
            )),
        };
        let cache = PricingCache::new(Duration::from_secs(60));
        let config = PricingConfig::default();
        let service = V3Service::new(&llm, &cache, &config);

        let estimate = service
            .estimate("Apple", "electronics_smartphone", Some("iPhone 13"), "GOOD", "NL")
            .await
            .unwrap();

        assert_eq!(estimate.low, 100.0);
        assert_eq!(estimate.high, 200.0);
        assert_eq!(estimate.why.len(), MAX_WHY_CHARS);
    }

    #[tokio::test]
    async fn clamps_multibyte_why_without_panicking() {
        let long_why = "\u{1F600}".repeat(300);
        let llm = StubLlm {
            response: Ok(format!(
                "{{\"low\":100,\"high\":200,\"cur\":\"EUR\",\"conf\":\"MED\",\"why\":\"{long_why}\"}}"
            )),
        };
        let cache = PricingCache::new(Duration::from_secs(60));
        let config = PricingConfig::default();
        let service = V3Service::new(&llm, &cache, &config);

        let estimate = service
            .estimate("Apple", "electronics_smartphone", Some("iPhone 13"), "GOOD", "NL")
            .await
            .unwrap();

        assert_eq!(estimate.why.chars().count(), MAX_WHY_CHARS);
    }

    #[tokio::test]
    async fn invalid_range_is_rejected() {
        let llm = StubLlm {
            response: Ok("{\"low\":200,\"high\":100,\"cur\":\"EUR\",\"conf\":\"LOW\",\"why\":\"bad\"}".to_string()),
        };
        let cache = PricingCache::new(Duration::from_secs(60));
        let config = PricingConfig::default();
        let service = V3Service::new(&llm, &cache, &config);

        let result = service
            .estimate("Apple", "electronics_smartphone", Some("iPhone 13"), "GOOD", "NL")
            .await;
        assert!(matches!(result, Err(PricingError::ValidationError(_))));
    }

    #[tokio::test]
    async fn repeated_request_hits_cache() {
        let llm = StubLlm {
            response: Ok("{\"low\":100,\"high\":200,\"cur\":\"EUR\",\"conf\":\"MED\",\"why\":\"ok\"}".to_string()),
        };
        let cache = PricingCache::new(Duration::from_secs(60));
        let config = PricingConfig::default();
        let service = V3Service::new(&llm, &cache, &config);

        service
            .estimate("Apple", "electronics_smartphone", Some("iPhone 13"), "GOOD", "NL")
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        service
            .estimate("apple", "electronics_smartphone", Some("iphone 13"), "good", "nl")
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
    }
}
