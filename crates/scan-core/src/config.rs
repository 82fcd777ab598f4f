//! Single immutable configuration record for the scan pipeline.
//!
//! All thresholds are injected here at construction rather than read from
//! globals, per the design notes: intervals, dwell, confidence, sharpness
//! cutoffs all live on this one record.

use std::env;
use std::time::Duration;

/// Motion, sharpness, tracker, guidance, and router thresholds.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Sub-sample step for the motion estimator's luma grid (design default 8).
    pub motion_sample_step: u32,
    /// Side length of the centered sharpness crop (design default 128).
    pub sharpness_window: u32,
    /// Below this, a frame is considered blurry (design default 100.0).
    pub sharpness_threshold: f32,

    /// Minimum IoU/tracking-id match score to accept a detection↔track match.
    pub tracker_min_match_score: f32,
    /// Maximum frame gap for a match to still be accepted.
    pub tracker_max_frame_gap: u32,
    /// Minimum confidence to create a new candidate or confirm one.
    pub tracker_min_confidence: f32,
    /// Minimum normalized box area to create a new candidate.
    pub tracker_min_box_area: f64,
    /// Frames-seen required before a candidate is confirmed.
    pub tracker_min_frames_to_confirm: u32,
    /// Frames-since-seen after which a candidate is retired.
    pub tracker_expiry_frames: u32,

    /// Minimum box-area fraction before guidance reports TOO_FAR.
    pub guidance_min_area: f64,
    /// Maximum box-area fraction before guidance reports TOO_CLOSE.
    pub guidance_max_area: f64,
    /// Maximum normalized center distance before guidance reports OFF_CENTER.
    pub guidance_max_center_distance: f64,
    /// Milliseconds GOOD must hold continuously before LOCKED (design ≥ 300ms).
    pub guidance_lock_dwell_ms: u64,
    /// Motion score above which guidance treats the scene as UNSTABLE.
    pub guidance_stability_threshold: f64,

    /// Minimum wall-clock interval between accepted invocations, per detector.
    pub router_min_interval_object: Duration,
    pub router_min_interval_barcode: Duration,
    pub router_min_interval_document: Duration,

    /// Watchdog: how often to check `lastFrameTimestamp` (design 2s).
    pub watchdog_check_interval: Duration,
    /// Consecutive missed checks before transitioning to FAILED (design 3).
    pub watchdog_max_misses: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            motion_sample_step: 8,
            sharpness_window: 128,
            sharpness_threshold: 100.0,

            tracker_min_match_score: 0.2,
            tracker_max_frame_gap: 8,
            tracker_min_confidence: 0.5,
            tracker_min_box_area: 0.01,
            tracker_min_frames_to_confirm: 3,
            tracker_expiry_frames: 10,

            guidance_min_area: 0.08,
            guidance_max_area: 0.75,
            guidance_max_center_distance: 0.25,
            guidance_lock_dwell_ms: 300,
            guidance_stability_threshold: 0.5,

            router_min_interval_object: Duration::from_millis(400),
            router_min_interval_barcode: Duration::from_millis(200),
            router_min_interval_document: Duration::from_millis(600),

            watchdog_check_interval: Duration::from_secs(2),
            watchdog_max_misses: 3,
        }
    }
}

impl ScanConfig {
    /// Loads overrides from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = env::var("SCAN_SHARPNESS_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                config.sharpness_threshold = parsed;
            }
        }
        if let Ok(v) = env::var("SCAN_TRACKER_MIN_CONFIDENCE") {
            if let Ok(parsed) = v.parse() {
                config.tracker_min_confidence = parsed;
            }
        }
        if let Ok(v) = env::var("SCAN_GUIDANCE_LOCK_DWELL_MS") {
            if let Ok(parsed) = v.parse() {
                config.guidance_lock_dwell_ms = parsed;
            }
        }

        config
    }

    /// Per-frame polling interval as a step function of the motion score
    /// (design: ≤0.1 → 600ms, ≤0.5 → 500ms, else 400ms).
    pub fn polling_interval_for_motion(&self, motion_score: f64) -> Duration {
        if motion_score <= 0.1 {
            Duration::from_millis(600)
        } else if motion_score <= 0.5 {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(400)
        }
    }
}
