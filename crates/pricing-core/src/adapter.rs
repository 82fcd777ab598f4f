//! Parallel marketplace fetchers with independent timeouts and per-adapter
//! circuit-breaker isolation (§4.10 step 3, §5 "Pricing pipeline").

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pricing_models::FetchedListing;

use crate::error::PricingResult;

/// The query an adapter receives, built from a `QueryPlan` plus request
/// context the builder doesn't know about (country, max results).
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub q: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub product_type: String,
    pub condition: Option<String>,
    pub country_code: String,
    pub category_id: Option<String>,
    pub max_results: u32,
}

/// Implemented per marketplace. Treated as an opaque provider (§1
/// Non-goals: "no marketplace crawling policy") — this crate only
/// specifies the boundary, not how any particular marketplace is crawled.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    fn id(&self) -> &str;
    async fn fetch_listings(&self, query: &ListingQuery) -> PricingResult<Vec<FetchedListing>>;
    fn build_search_url(&self, query: &ListingQuery) -> String;
    async fn is_healthy(&self) -> bool;
}

/// Closed: calls pass through. Open: calls fail fast until `recovery_time`
/// elapses. HalfOpen: a limited number of probe calls are allowed through
/// before the breaker fully closes again.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CircuitState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen { success_count: u32 },
}

/// Per-adapter failure isolation, so one misbehaving marketplace can't
/// monopolize retries or keep failing every request once it has degraded.
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    consecutive_failures: AtomicU32,
    failure_threshold: u32,
    recovery_time: Duration,
    half_open_success_target: u32,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_time: Duration, half_open_success_target: u32) -> Self {
        Self {
            state: Mutex::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            failure_threshold,
            recovery_time,
            half_open_success_target,
        }
    }

    /// Whether a call should be attempted right now.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen { .. } => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.recovery_time {
                    *state = CircuitState::HalfOpen { success_count: 0 };
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let CircuitState::HalfOpen { success_count } = *state {
            let next = success_count + 1;
            if next >= self.half_open_success_target {
                *state = CircuitState::Closed;
            } else {
                *state = CircuitState::HalfOpen { success_count: next };
            }
        }
    }

    pub fn failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().unwrap();
        if matches!(*state, CircuitState::HalfOpen { .. }) || failures >= self.failure_threshold {
            *state = CircuitState::Open {
                opened_at: Instant::now(),
            };
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock().unwrap(), CircuitState::Open { .. })
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60), 3)
    }
}

/// Outcome of one adapter's call, recorded for metrics (§11).
#[derive(Debug, Clone)]
pub enum AdapterOutcome {
    Success(Vec<FetchedListing>),
    Error(String),
    Timeout,
    CircuitOpen,
}

/// Fan-out across all registered adapters under a shared per-adapter
/// timeout, isolating failures so one bad adapter never fails the request.
pub struct AdapterRegistry {
    adapters: Vec<(Box<dyn MarketplaceAdapter>, CircuitBreaker)>,
    latency_ms_total: AtomicU64,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            latency_ms_total: AtomicU64::new(0),
        }
    }

    pub fn register(&mut self, adapter: Box<dyn MarketplaceAdapter>, breaker: CircuitBreaker) {
        self.adapters.push((adapter, breaker));
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Fetches from every registered adapter in parallel, each bounded by
    /// `timeout`. Failures and timeouts are isolated per adapter; callers
    /// get back one outcome per adapter, keyed by adapter id.
    pub async fn fetch_all(
        &self,
        query: &ListingQuery,
        timeout: Duration,
    ) -> Vec<(String, AdapterOutcome)> {
        let futures = self.adapters.iter().map(|(adapter, breaker)| {
            self.fetch_one(adapter.as_ref(), breaker, query, timeout)
        });

        futures_join_all(futures).await
    }

    async fn fetch_one(
        &self,
        adapter: &dyn MarketplaceAdapter,
        breaker: &CircuitBreaker,
        query: &ListingQuery,
        timeout: Duration,
    ) -> (String, AdapterOutcome) {
        let id = adapter.id().to_string();

        if !breaker.allow() {
            return (id, AdapterOutcome::CircuitOpen);
        }

        let started = Instant::now();
        let outcome = match tokio::time::timeout(timeout, adapter.fetch_listings(query)).await {
            Ok(Ok(listings)) => {
                breaker.success();
                AdapterOutcome::Success(listings)
            }
            Ok(Err(err)) => {
                breaker.failure();
                tracing::warn!(adapter = %id, error = %err, "adapter fetch failed");
                AdapterOutcome::Error(err.to_string())
            }
            Err(_) => {
                breaker.failure();
                tracing::warn!(adapter = %id, timeout_ms = timeout.as_millis() as u64, "adapter fetch timed out");
                AdapterOutcome::Timeout
            }
        };

        self.latency_ms_total
            .fetch_add(started.elapsed().as_millis() as u64, Ordering::Relaxed);

        (id, outcome)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Small local stand-in for `futures::future::join_all` so this crate
/// doesn't need to pull in the full `futures` crate for one combinator.
async fn futures_join_all<F, T>(futures: impl Iterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T>,
{
    let handles: Vec<F> = futures.collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60), 2);
        assert!(breaker.allow());
        breaker.failure();
        breaker.failure();
        assert!(!breaker.is_open());
        breaker.failure();
        assert!(breaker.is_open());
        assert!(!breaker.allow());
    }

    #[test]
    fn breaker_half_opens_after_recovery_time() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1), 1);
        breaker.failure();
        assert!(breaker.is_open());
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow());
    }

    #[test]
    fn breaker_closes_after_enough_half_open_successes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1), 2);
        breaker.failure();
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow());
        breaker.success();
        assert!(!breaker.is_open());
        breaker.success();
        assert!(breaker.allow());
        assert!(!breaker.is_open());
    }
}
