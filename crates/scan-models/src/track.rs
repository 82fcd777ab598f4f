use crate::rect::NormalizedRect;

/// Per-track state owned exclusively by the tracker. The analyzer only ever
/// sees immutable snapshots of these.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCandidate {
    pub id: u32,
    pub last_box: NormalizedRect,
    pub smoothed_box: NormalizedRect,
    pub max_confidence: f32,
    pub frames_seen: u32,
    pub frames_since_seen: u32,
    pub label: String,
    pub category: String,
    pub consumed: bool,
    pub best_sharpness: f32,
    pub backend_tracking_id: Option<u32>,
}

impl TrackCandidate {
    pub fn new(id: u32, label: &str, category: &str, box_: NormalizedRect, confidence: f32) -> Self {
        Self {
            id,
            last_box: box_,
            smoothed_box: box_,
            max_confidence: confidence,
            frames_seen: 1,
            frames_since_seen: 0,
            label: label.to_string(),
            category: category.to_string(),
            consumed: false,
            best_sharpness: 0.0,
            backend_tracking_id: None,
        }
    }

    pub fn is_confirmed(&self, min_frames_to_confirm: u32, min_confidence: f32) -> bool {
        self.frames_seen >= min_frames_to_confirm
            && self.max_confidence >= min_confidence
            && !self.consumed
    }
}
