use crate::detection::CaptureType;
use crate::rect::NormalizedRect;

/// Emitted at LOCK (tracking path) or per single-shot detection. Each
/// `RawDetection` owns its own image buffer — ref-counted sharing is unsafe
/// here because deleting one sibling must never invalidate another.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub box_upright: NormalizedRect,
    pub confidence: f32,
    pub label: String,
    pub category: String,
    pub tracking_id: Option<u32>,
    pub sharpness_at_capture: f32,
    pub capture_type: CaptureType,
    /// Identifier shared by every `RawDetection` produced from the same
    /// frame (single-shot) or the same lock event (tracking).
    pub capture_id: u64,
    pub thumbnail: Option<Vec<u8>>,
    pub full_frame: Option<FullFrameHandle>,
}

/// A private, non-shared handle to a full-resolution frame buffer. Each
/// `RawDetection` gets its own copy so releasing one never tears down a
/// buffer a sibling still references.
#[derive(Debug, Clone)]
pub struct FullFrameHandle {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawDetection {
    pub fn new(
        box_upright: NormalizedRect,
        confidence: f32,
        label: &str,
        category: &str,
        sharpness_at_capture: f32,
        capture_type: CaptureType,
        capture_id: u64,
    ) -> Self {
        Self {
            box_upright,
            confidence,
            label: label.to_string(),
            category: category.to_string(),
            tracking_id: None,
            sharpness_at_capture,
            capture_type,
            capture_id,
            thumbnail: None,
            full_frame: None,
        }
    }
}
