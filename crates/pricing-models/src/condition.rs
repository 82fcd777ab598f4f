use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Item condition, as accepted by the `/v1/pricing/v3` and `/v1/pricing/v4`
/// request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    NewSealed,
    NewWithTags,
    NewWithoutTags,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::NewSealed => "NEW_SEALED",
            Condition::NewWithTags => "NEW_WITH_TAGS",
            Condition::NewWithoutTags => "NEW_WITHOUT_TAGS",
            Condition::LikeNew => "LIKE_NEW",
            Condition::Good => "GOOD",
            Condition::Fair => "FAIR",
            Condition::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
