//! Merges tracker output, motion, sharpness, and ROI into the scan-guidance
//! state machine (§4.5).

use scan_models::{GuidanceState, NormalizedRect, ScanGuidanceState, ScanRoi, ScanRoiDto, TrackCandidate};

use crate::config::ScanConfig;

const STABILITY_WINDOW: usize = 5;

/// Owns the ROI and the short history needed to judge stability; everything
/// else is passed in fresh each frame.
#[derive(Debug)]
pub struct GuidanceManager {
    roi: ScanRoi,
    state: GuidanceState,
    locked_candidate_id: Option<u32>,
    good_since_ms: Option<u64>,
    good_candidate_id: Option<u32>,
    center_history: Vec<(f64, f64)>,
}

/// What the manager needs to know about the current frame's best candidate.
#[derive(Debug, Clone, Copy)]
pub struct BestCandidate {
    pub id: u32,
    pub box_upright: NormalizedRect,
    pub confidence: f32,
}

impl GuidanceManager {
    pub fn new(roi: ScanRoi) -> Self {
        Self {
            roi,
            state: GuidanceState::Searching,
            locked_candidate_id: None,
            good_since_ms: None,
            good_candidate_id: None,
            center_history: Vec::new(),
        }
    }

    pub fn with_default_roi() -> Self {
        Self::new(ScanRoi::default_central())
    }

    pub fn roi(&self) -> &ScanRoi {
        &self.roi
    }

    pub fn state(&self) -> GuidanceState {
        self.state
    }

    /// Advances the state machine by one frame and returns the full snapshot.
    pub fn update(
        &mut self,
        best: Option<BestCandidate>,
        motion_score: f64,
        sharpness: f32,
        now_ms: u64,
        config: &ScanConfig,
    ) -> ScanGuidanceState {
        let next_state = self.compute_next_state(best, motion_score, sharpness, now_ms, config);
        self.apply_transition(next_state, best, now_ms);

        let center_distance = best.map(|b| {
            let (cx, cy) = b.box_upright.center();
            self.roi.center_distance(cx, cy)
        });
        let area = best.map(|b| b.box_upright.area());

        let can_add_item = self.state == GuidanceState::Locked && self.locked_candidate_id.is_some();
        let hint = self.hint_for_state();

        ScanGuidanceState {
            state: self.state,
            roi: ScanRoiDto::from(self.roi),
            detected_box_area: area,
            sharpness,
            motion: motion_score,
            center_distance,
            locked_candidate_id: self.locked_candidate_id,
            can_add_item,
            hint,
        }
    }

    fn compute_next_state(
        &mut self,
        best: Option<BestCandidate>,
        motion_score: f64,
        sharpness: f32,
        now_ms: u64,
        config: &ScanConfig,
    ) -> GuidanceState {
        let best = match best {
            None => {
                self.center_history.clear();
                return GuidanceState::Searching;
            }
            Some(b) => b,
        };

        let (cx, cy) = best.box_upright.center();
        self.center_history.push((cx, cy));
        if self.center_history.len() > STABILITY_WINDOW {
            self.center_history.remove(0);
        }

        let area = best.box_upright.area();
        let center_distance = self.roi.center_distance(cx, cy);
        let stability = self.center_variance();

        if area < config.guidance_min_area {
            return GuidanceState::TooFar;
        }
        if area > config.guidance_max_area {
            return GuidanceState::TooClose;
        }
        if center_distance > config.guidance_max_center_distance {
            return GuidanceState::OffCenter;
        }
        if stability > config.guidance_stability_threshold || motion_score > config.guidance_stability_threshold {
            return GuidanceState::Unstable;
        }
        if sharpness < config.sharpness_threshold {
            return GuidanceState::Focusing;
        }

        if self.state == GuidanceState::Good || self.state == GuidanceState::Locked {
            let same_candidate = self.good_candidate_id == Some(best.id);
            if same_candidate {
                if let Some(since) = self.good_since_ms {
                    if now_ms.saturating_sub(since) >= config.guidance_lock_dwell_ms {
                        return GuidanceState::Locked;
                    }
                }
            }
        }
        GuidanceState::Good
    }

    fn apply_transition(&mut self, next: GuidanceState, best: Option<BestCandidate>, now_ms: u64) {
        if next == GuidanceState::Good {
            let candidate_id = best.map(|b| b.id);
            if self.good_candidate_id != candidate_id || self.state != GuidanceState::Good {
                self.good_since_ms = Some(now_ms);
                self.good_candidate_id = candidate_id;
            }
        }

        if next == GuidanceState::Locked {
            self.locked_candidate_id = self.good_candidate_id;
        } else if self.state == GuidanceState::Locked
            && (next == GuidanceState::Searching || best.map(|b| Some(b.id)) != Some(self.locked_candidate_id))
        {
            self.locked_candidate_id = None;
        }

        if next != GuidanceState::Good && next != GuidanceState::Locked {
            self.good_since_ms = None;
            self.good_candidate_id = None;
        }

        self.state = next;
    }

    fn center_variance(&self) -> f64 {
        if self.center_history.len() < 2 {
            return 0.0;
        }
        let n = self.center_history.len() as f64;
        let mean_x: f64 = self.center_history.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y: f64 = self.center_history.iter().map(|(_, y)| y).sum::<f64>() / n;
        let variance: f64 = self
            .center_history
            .iter()
            .map(|(x, y)| (x - mean_x).powi(2) + (y - mean_y).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }

    fn hint_for_state(&self) -> Option<String> {
        match self.state {
            GuidanceState::Searching => Some("Point the camera at an item".to_string()),
            GuidanceState::TooFar => Some("Move closer".to_string()),
            GuidanceState::TooClose => Some("Move back".to_string()),
            GuidanceState::OffCenter => Some("Center the item".to_string()),
            GuidanceState::Unstable => Some("Hold steady".to_string()),
            GuidanceState::Focusing => Some("Hold still to focus".to_string()),
            GuidanceState::Good => Some("Hold still".to_string()),
            GuidanceState::Locked => None,
        }
    }

    /// Whether `candidate`'s box is fully inside the ROI, checked at commit
    /// time before a lock is allowed to turn into a `RawDetection`.
    pub fn is_contained(&self, candidate: &TrackCandidate) -> bool {
        self.roi.contains(&candidate.smoothed_box)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScanConfig {
        ScanConfig::default()
    }

    #[test]
    fn no_candidate_is_searching() {
        let mut manager = GuidanceManager::with_default_roi();
        let snapshot = manager.update(None, 0.0, 0.0, 0, &config());
        assert_eq!(snapshot.state, GuidanceState::Searching);
        assert!(!snapshot.can_add_item);
    }

    #[test]
    fn stable_centered_candidate_locks_after_dwell() {
        let mut manager = GuidanceManager::with_default_roi();
        let config = config();
        let candidate = BestCandidate {
            id: 1,
            box_upright: NormalizedRect::new(0.3, 0.3, 0.7, 0.7),
            confidence: 0.9,
        };

        let mut last = manager.update(Some(candidate), 0.05, 250.0, 0, &config);
        for frame in 1..10u64 {
            last = manager.update(Some(candidate), 0.05, 250.0, frame * 50, &config);
        }

        assert_eq!(last.state, GuidanceState::Locked);
        assert!(last.can_add_item);
        assert_eq!(last.locked_candidate_id, Some(1));
    }

    #[test]
    fn out_of_roi_candidate_never_locks() {
        let mut manager = GuidanceManager::with_default_roi();
        let config = config();
        let candidate = BestCandidate {
            id: 1,
            box_upright: NormalizedRect::new(0.05, 0.05, 0.2, 0.2),
            confidence: 0.9,
        };

        let mut last = manager.update(Some(candidate), 0.05, 250.0, 0, &config);
        for frame in 1..10u64 {
            last = manager.update(Some(candidate), 0.05, 250.0, frame * 50, &config);
        }

        assert_ne!(last.state, GuidanceState::Locked);
    }

    #[test]
    fn candidate_disappearing_returns_to_searching_from_locked() {
        let mut manager = GuidanceManager::with_default_roi();
        let config = config();
        let candidate = BestCandidate {
            id: 1,
            box_upright: NormalizedRect::new(0.3, 0.3, 0.7, 0.7),
            confidence: 0.9,
        };
        for frame in 0..10u64 {
            manager.update(Some(candidate), 0.05, 250.0, frame * 50, &config);
        }
        let snapshot = manager.update(None, 0.05, 250.0, 1000, &config);
        assert_eq!(snapshot.state, GuidanceState::Searching);
        assert!(!snapshot.can_add_item);
    }
}
