//! Per-mode throttle and dedupe gate in front of the ML backends (§4.6).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use scan_models::{DetectionEvent, EventHeader, ScanMode};

use crate::config::ScanConfig;

/// Per-detector counters, exposed for diagnostics and metrics export.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouterCounters {
    pub frames_seen: u64,
    pub invocations_accepted: u64,
    pub invocations_throttled: u64,
    pub items_deduped: u64,
}

/// Gates invocation of each detector to at most once per its configured
/// minimum interval, and deduplicates repeated detections by fingerprint.
#[derive(Debug)]
pub struct DetectionRouter {
    last_invocation: HashMap<ScanMode, Instant>,
    seen_fingerprints: HashMap<ScanMode, Vec<String>>,
    counters: HashMap<ScanMode, RouterCounters>,
}

impl DetectionRouter {
    pub fn new() -> Self {
        Self {
            last_invocation: HashMap::new(),
            seen_fingerprints: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    fn min_interval(mode: ScanMode, config: &ScanConfig) -> Duration {
        match mode {
            ScanMode::ObjectDetection => config.router_min_interval_object,
            ScanMode::Barcode => config.router_min_interval_barcode,
            ScanMode::DocumentText => config.router_min_interval_document,
        }
    }

    /// Atomically decides whether enough wall-clock time has elapsed since
    /// the last accepted invocation of `mode`. Returns `Ok(())` on accept,
    /// or the throttle event to emit on reject.
    pub fn try_invoke(
        &mut self,
        mode: ScanMode,
        now: Instant,
        config: &ScanConfig,
        source: &str,
    ) -> Result<(), DetectionEvent> {
        let counters = self.counters.entry(mode).or_default();
        counters.frames_seen += 1;

        let min_interval = Self::min_interval(mode, config);
        let elapsed_ok = match self.last_invocation.get(&mode) {
            Some(last) => now.duration_since(*last) >= min_interval,
            None => true,
        };

        if elapsed_ok {
            self.last_invocation.insert(mode, now);
            self.counters.entry(mode).or_default().invocations_accepted += 1;
            Ok(())
        } else {
            self.counters.entry(mode).or_default().invocations_throttled += 1;
            Err(DetectionEvent::Throttled {
                header: EventHeader {
                    timestamp_ms: 0,
                    source: source.to_string(),
                },
                reason: "min_interval_not_elapsed".to_string(),
            })
        }
    }

    /// Deduplicates a detection result keyed by a normalized fingerprint
    /// (e.g. category+rounded box for object detection, decoded value for
    /// barcode). Returns `true` if this fingerprint is new for `mode`.
    pub fn dedupe(&mut self, mode: ScanMode, fingerprint: &str) -> bool {
        let seen = self.seen_fingerprints.entry(mode).or_default();
        if seen.iter().any(|f| f == fingerprint) {
            self.counters.entry(mode).or_default().items_deduped += 1;
            return false;
        }
        seen.push(fingerprint.to_string());
        if seen.len() > 32 {
            seen.remove(0);
        }
        true
    }

    pub fn counters(&self, mode: ScanMode) -> RouterCounters {
        self.counters.get(&mode).copied().unwrap_or_default()
    }
}

impl Default for DetectionRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_invocation_is_always_accepted() {
        let mut router = DetectionRouter::new();
        let config = ScanConfig::default();
        let result = router.try_invoke(ScanMode::ObjectDetection, Instant::now(), &config, "camera");
        assert!(result.is_ok());
        assert_eq!(router.counters(ScanMode::ObjectDetection).invocations_accepted, 1);
    }

    #[test]
    fn rapid_second_invocation_is_throttled() {
        let mut router = DetectionRouter::new();
        let config = ScanConfig::default();
        let now = Instant::now();
        router.try_invoke(ScanMode::ObjectDetection, now, &config, "camera").unwrap();
        let result = router.try_invoke(ScanMode::ObjectDetection, now, &config, "camera");
        assert!(result.is_err());
        assert_eq!(router.counters(ScanMode::ObjectDetection).invocations_throttled, 1);
    }

    #[test]
    fn invocation_after_interval_elapses_is_accepted() {
        let mut router = DetectionRouter::new();
        let config = ScanConfig::default();
        let now = Instant::now();
        router.try_invoke(ScanMode::ObjectDetection, now, &config, "camera").unwrap();
        let later = now + config.router_min_interval_object + Duration::from_millis(1);
        let result = router.try_invoke(ScanMode::ObjectDetection, later, &config, "camera");
        assert!(result.is_ok());
    }

    #[test]
    fn dedupe_rejects_repeated_fingerprint() {
        let mut router = DetectionRouter::new();
        assert!(router.dedupe(ScanMode::Barcode, "abc123"));
        assert!(!router.dedupe(ScanMode::Barcode, "abc123"));
        assert_eq!(router.counters(ScanMode::Barcode).items_deduped, 1);
    }
}
