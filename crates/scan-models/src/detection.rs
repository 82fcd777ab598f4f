use serde::{Deserialize, Serialize};

use crate::rect::NormalizedRect;

/// A single detection produced by an ML backend for one frame.
///
/// Boxes are always upright-normalized (post sensor-rotation), never
/// pre-rotated sensor-space boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub box_upright: NormalizedRect,
    pub confidence: f32,
    pub category: String,
    pub label: String,
    pub tracking_id: Option<u32>,
}

impl Detection {
    pub fn new(box_upright: NormalizedRect, confidence: f32, category: &str, label: &str) -> Self {
        Self {
            box_upright,
            confidence,
            category: category.to_string(),
            label: label.to_string(),
            tracking_id: None,
        }
    }

    pub fn with_tracking_id(mut self, id: u32) -> Self {
        self.tracking_id = Some(id);
        self
    }
}

/// Mutually exclusive scanning modes; each drives a distinct detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    ObjectDetection,
    Barcode,
    DocumentText,
}

/// How a `RawDetection` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureType {
    SingleShot,
    Tracking,
}
