//! Shared LLM-client boundary used by the AI clusterer and the V3 service.
//!
//! Both call through this trait rather than a concrete HTTP client so they
//! stay testable with a stub, and so either can sit behind a multi-model
//! fallback list the way the host application chooses to wire one up.

use async_trait::async_trait;

use crate::error::PricingResult;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> PricingResult<String>;
}

/// Strips a leading/trailing ```json fence (or bare ```) from an LLM
/// response before handing it to `serde_json`, mirroring the tolerant
/// parsing real model output needs.
pub fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_prefix = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_prefix.strip_suffix("```").unwrap_or(without_prefix).trim()
}
