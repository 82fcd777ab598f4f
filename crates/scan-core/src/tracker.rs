//! Maintains candidate tracks across frames and promotes stable ones to
//! "confirmed".

use std::collections::HashMap;

use scan_models::{NormalizedRect, TrackCandidate};

use crate::config::ScanConfig;

/// A single incoming detection handed to the tracker for one frame.
#[derive(Debug, Clone)]
pub struct TrackerInput {
    pub box_upright: NormalizedRect,
    pub confidence: f32,
    pub label: String,
    pub category: String,
    pub backend_tracking_id: Option<u32>,
}

/// IoU- and tracking-id-assisted multi-object tracker.
#[derive(Debug)]
pub struct ObjectTracker {
    candidates: HashMap<u32, TrackCandidate>,
    next_id: u32,
    frame_counter: u64,
    smoothing_alpha: f64,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self {
            candidates: HashMap::new(),
            next_id: 1,
            frame_counter: 0,
            smoothing_alpha: 0.35,
        }
    }

    pub fn reset(&mut self) {
        self.candidates.clear();
        self.next_id = 1;
        self.frame_counter = 0;
    }

    pub fn active_track_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn confirmed_unconsumed(&self, config: &ScanConfig) -> Vec<TrackCandidate> {
        self.candidates
            .values()
            .filter(|c| c.is_confirmed(config.tracker_min_frames_to_confirm, config.tracker_min_confidence))
            .cloned()
            .collect()
    }

    pub fn mark_consumed(&mut self, id: u32) {
        if let Some(candidate) = self.candidates.get_mut(&id) {
            candidate.consumed = true;
        }
    }

    /// Runs one frame of tracking and returns the candidates newly confirmed
    /// this frame (not already consumed).
    pub fn process_frame(
        &mut self,
        detections: &[TrackerInput],
        config: &ScanConfig,
    ) -> Vec<TrackCandidate> {
        self.frame_counter += 1;

        for candidate in self.candidates.values_mut() {
            candidate.frames_since_seen += 1;
        }

        let mut matched_ids: Vec<u32> = Vec::new();
        for detection in detections {
            match self.best_match(detection, config, &matched_ids) {
                Some(id) => {
                    matched_ids.push(id);
                    self.update_candidate(id, detection);
                }
                None => {
                    if detection.confidence >= config.tracker_min_confidence
                        && detection.box_upright.area() >= config.tracker_min_box_area
                    {
                        self.create_candidate(detection);
                    }
                }
            }
        }

        self.resolve_duplicate_backend_ids();

        self.candidates
            .retain(|_, c| c.frames_since_seen <= config.tracker_expiry_frames);

        let mut newly_confirmed = Vec::new();
        for id in &matched_ids {
            if let Some(candidate) = self.candidates.get(id) {
                if candidate.frames_seen == config.tracker_min_frames_to_confirm
                    && candidate.max_confidence >= config.tracker_min_confidence
                    && !candidate.consumed
                {
                    newly_confirmed.push(candidate.clone());
                }
            }
        }
        newly_confirmed
    }

    fn best_match(
        &self,
        detection: &TrackerInput,
        config: &ScanConfig,
        already_matched: &[u32],
    ) -> Option<u32> {
        let mut best_id = None;
        let mut best_score = 0.0f32;

        for (id, candidate) in &self.candidates {
            if already_matched.contains(id) {
                continue;
            }
            if candidate.frames_since_seen > config.tracker_max_frame_gap {
                continue;
            }

            let iou = candidate.last_box.iou(&detection.box_upright) as f32;
            let id_bonus = match (candidate.backend_tracking_id, detection.backend_tracking_id) {
                (Some(a), Some(b)) if a == b => 0.5,
                _ => 0.0,
            };
            let score = (iou + id_bonus).min(1.0);

            if score >= config.tracker_min_match_score && score > best_score {
                best_score = score;
                best_id = Some(*id);
            }
        }

        best_id
    }

    fn update_candidate(&mut self, id: u32, detection: &TrackerInput) {
        if let Some(candidate) = self.candidates.get_mut(&id) {
            candidate.frames_seen += 1;
            candidate.frames_since_seen = 0;
            candidate.last_box = detection.box_upright;
            candidate.smoothed_box = candidate.smoothed_box.smoothed(&detection.box_upright, self.smoothing_alpha);
            candidate.max_confidence = candidate.max_confidence.max(detection.confidence);
            if detection.backend_tracking_id.is_some() {
                candidate.backend_tracking_id = detection.backend_tracking_id;
            }
        }
    }

    fn create_candidate(&mut self, detection: &TrackerInput) {
        let id = self.next_id;
        self.next_id += 1;
        let mut candidate = TrackCandidate::new(
            id,
            &detection.label,
            &detection.category,
            detection.box_upright,
            detection.confidence,
        );
        candidate.backend_tracking_id = detection.backend_tracking_id;
        self.candidates.insert(id, candidate);
    }

    /// Per §4.4 failure modes: a duplicate backend tracking id across
    /// candidates is resolved in favor of the one with more frames-seen,
    /// ties broken by higher max-confidence.
    fn resolve_duplicate_backend_ids(&mut self) {
        let mut by_backend_id: HashMap<u32, Vec<u32>> = HashMap::new();
        for candidate in self.candidates.values() {
            if let Some(backend_id) = candidate.backend_tracking_id {
                by_backend_id.entry(backend_id).or_default().push(candidate.id);
            }
        }

        for (_, ids) in by_backend_id {
            if ids.len() <= 1 {
                continue;
            }
            let winner = ids
                .iter()
                .max_by(|&&a, &&b| {
                    let ca = &self.candidates[&a];
                    let cb = &self.candidates[&b];
                    ca.frames_seen
                        .cmp(&cb.frames_seen)
                        .then(ca.max_confidence.total_cmp(&cb.max_confidence))
                })
                .copied();

            for id in ids {
                if Some(id) != winner {
                    if let Some(candidate) = self.candidates.get_mut(&id) {
                        candidate.backend_tracking_id = None;
                    }
                }
            }
        }
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(box_: NormalizedRect, confidence: f32) -> TrackerInput {
        TrackerInput {
            box_upright: box_,
            confidence,
            label: "phone".to_string(),
            category: "electronics".to_string(),
            backend_tracking_id: None,
        }
    }

    #[test]
    fn new_candidate_is_not_confirmed_immediately() {
        let mut tracker = ObjectTracker::new();
        let config = ScanConfig::default();
        let confirmed = tracker.process_frame(&[det(NormalizedRect::new(0.3, 0.3, 0.7, 0.7), 0.8)], &config);
        assert!(confirmed.is_empty());
        assert_eq!(tracker.active_track_count(), 1);
    }

    #[test]
    fn stable_detection_confirms_after_min_frames() {
        let mut tracker = ObjectTracker::new();
        let config = ScanConfig::default();
        let box_ = NormalizedRect::new(0.3, 0.3, 0.7, 0.7);
        let mut confirmed = Vec::new();
        for _ in 0..config.tracker_min_frames_to_confirm {
            confirmed = tracker.process_frame(&[det(box_, 0.8)], &config);
        }
        assert_eq!(confirmed.len(), 1);
        assert!(!confirmed[0].consumed);
    }

    #[test]
    fn confirmed_candidate_not_re_emitted_until_consumed_cleared() {
        let mut tracker = ObjectTracker::new();
        let config = ScanConfig::default();
        let box_ = NormalizedRect::new(0.3, 0.3, 0.7, 0.7);
        for _ in 0..config.tracker_min_frames_to_confirm {
            tracker.process_frame(&[det(box_, 0.8)], &config);
        }
        let confirmed_again = tracker.process_frame(&[det(box_, 0.8)], &config);
        assert!(confirmed_again.is_empty());
    }

    #[test]
    fn stale_candidate_is_retired_after_expiry() {
        let mut tracker = ObjectTracker::new();
        let config = ScanConfig::default();
        let box_ = NormalizedRect::new(0.3, 0.3, 0.7, 0.7);
        tracker.process_frame(&[det(box_, 0.8)], &config);
        for _ in 0..=config.tracker_expiry_frames {
            tracker.process_frame(&[], &config);
        }
        assert_eq!(tracker.active_track_count(), 0);
    }

    #[test]
    fn reset_clears_all_state() {
        let mut tracker = ObjectTracker::new();
        let config = ScanConfig::default();
        tracker.process_frame(&[det(NormalizedRect::new(0.3, 0.3, 0.7, 0.7), 0.8)], &config);
        tracker.reset();
        assert_eq!(tracker.active_track_count(), 0);
    }
}
