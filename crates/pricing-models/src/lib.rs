//! Shared value types for the marketplace pricing core.
//!
//! As with `scan-models`, this crate carries no behavior: it defines the
//! entities the query-plan builder, adapters, filter, clusterer,
//! aggregator, and V3/V4 services pass between each other.

pub mod condition;
pub mod insights;
pub mod listing;
pub mod query_plan;

pub use condition::Condition;
pub use insights::{
    MatchTally, PriceRange, PricingConfidence, PricingInsights, PricingSource, PricingStatus,
};
pub use listing::{FetchedListing, MatchConfidence, NormalizedListing};
pub use query_plan::{PostFilterRule, QueryFilter, QueryPlan, QueryPlanInput, QueryPlanTelemetry};
