//! Optional LLM-assisted normalizer that tags listings as match/non-match
//! with confidence (§4.10 step 5).

use pricing_models::{Condition, FetchedListing, MatchConfidence, NormalizedListing};
use serde::Deserialize;

use crate::error::{PricingError, PricingResult};
use crate::llm::{strip_json_fences, LlmClient};

#[derive(Debug, Deserialize)]
struct ClusterTag {
    index: usize,
    confidence: String,
    normalized_condition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClusterResponse {
    tags: Vec<ClusterTag>,
}

pub struct AiClusterer<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> AiClusterer<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    /// Tags each listing with a match confidence and normalized condition.
    /// On any LLM/parse failure, degrades to "keep all survivors as HIGH"
    /// per the `NormalizationError` policy in §7, rather than failing the
    /// request.
    pub async fn classify(&self, query_text: &str, listings: &[FetchedListing]) -> Vec<NormalizedListing> {
        match self.classify_inner(query_text, listings).await {
            Ok(tagged) => tagged,
            Err(err) => {
                tracing::warn!(error = %err, "AI clusterer normalization failed, keeping all survivors as HIGH");
                listings
                    .iter()
                    .map(|listing| NormalizedListing {
                        listing: listing.clone(),
                        match_confidence: MatchConfidence::High,
                        normalized_condition: listing.condition,
                    })
                    .collect()
            }
        }
    }

    async fn classify_inner(
        &self,
        query_text: &str,
        listings: &[FetchedListing],
    ) -> PricingResult<Vec<NormalizedListing>> {
        let prompt = build_prompt(query_text, listings);
        let raw = self.llm.complete(&prompt).await?;
        let json = strip_json_fences(&raw);
        let parsed: ClusterResponse =
            serde_json::from_str(json).map_err(|e| PricingError::ValidationError(e.to_string()))?;

        let mut tags_by_index = std::collections::HashMap::new();
        for tag in parsed.tags {
            tags_by_index.insert(tag.index, tag);
        }

        let mut out = Vec::with_capacity(listings.len());
        for (index, listing) in listings.iter().enumerate() {
            let (confidence, normalized_condition) = match tags_by_index.get(&index) {
                Some(tag) => (
                    parse_confidence(&tag.confidence),
                    tag.normalized_condition
                        .as_deref()
                        .and_then(parse_condition)
                        .or(listing.condition),
                ),
                None => (MatchConfidence::Low, listing.condition),
            };

            out.push(NormalizedListing {
                listing: listing.clone(),
                match_confidence: confidence,
                normalized_condition,
            });
        }

        Ok(out)
    }
}

fn build_prompt(query_text: &str, listings: &[FetchedListing]) -> String {
    let mut lines = Vec::with_capacity(listings.len() + 1);
    lines.push(format!(
        "For the search \"{query_text}\", tag each listing below as HIGH/MED/LOW match \
         confidence and its normalized condition. Respond with JSON: \
         {{\"tags\":[{{\"index\":0,\"confidence\":\"HIGH\",\"normalized_condition\":\"GOOD\"}}]}}"
    ));
    for (index, listing) in listings.iter().enumerate() {
        lines.push(format!("{index}: {}", listing.title));
    }
    lines.join("\n")
}

fn parse_confidence(raw: &str) -> MatchConfidence {
    match raw.to_uppercase().as_str() {
        "HIGH" => MatchConfidence::High,
        "MED" => MatchConfidence::Med,
        _ => MatchConfidence::Low,
    }
}

fn parse_condition(raw: &str) -> Option<Condition> {
    match raw.to_uppercase().as_str() {
        "NEW_SEALED" => Some(Condition::NewSealed),
        "NEW_WITH_TAGS" => Some(Condition::NewWithTags),
        "NEW_WITHOUT_TAGS" => Some(Condition::NewWithoutTags),
        "LIKE_NEW" => Some(Condition::LikeNew),
        "GOOD" => Some(Condition::Good),
        "FAIR" => Some(Condition::Fair),
        "POOR" => Some(Condition::Poor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubLlm {
        response: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, _prompt: &str) -> PricingResult<String> {
            Ok(self.response.clone())
        }
    }

    fn listing(title: &str) -> FetchedListing {
        FetchedListing {
            title: title.to_string(),
            price: 100.0,
            currency: "EUR".to_string(),
            condition: None,
            source_marketplace_id: "ebay".to_string(),
            url: None,
        }
    }

    #[tokio::test]
    async fn classifies_listings_from_llm_response() {
        let llm = StubLlm {
            response: "```json\n{\"tags\":[{\"index\":0,\"confidence\":\"HIGH\",\"normalized_condition\":\"GOOD\"}]}\n```"
                .to_string(),
        };
        let clusterer = AiClusterer::new(&llm);
        let listings = vec![listing("iPhone 13 good condition")];
        let tagged = clusterer.classify("iphone 13", &listings).await;
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].match_confidence, MatchConfidence::High);
        assert_eq!(tagged[0].normalized_condition, Some(Condition::Good));
    }

    #[tokio::test]
    async fn degrades_to_all_high_on_parse_failure() {
        let llm = StubLlm {
            response: "not json".to_string(),
        };
        let clusterer = AiClusterer::new(&llm);
        let listings = vec![listing("iPhone 13"), listing("iPhone 13 Pro")];
        let tagged = clusterer.classify("iphone 13", &listings).await;
        assert_eq!(tagged.len(), 2);
        assert!(tagged.iter().all(|t| t.match_confidence == MatchConfidence::High));
    }
}
