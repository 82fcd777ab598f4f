use serde::{Deserialize, Serialize};

use crate::roi::ScanRoi;

/// One value per frame; see the guidance state machine for transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuidanceState {
    Searching,
    TooClose,
    TooFar,
    OffCenter,
    Unstable,
    Focusing,
    Good,
    Locked,
}

impl Default for GuidanceState {
    fn default() -> Self {
        GuidanceState::Searching
    }
}

/// Full per-frame guidance snapshot handed to the host for overlay rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanGuidanceState {
    pub state: GuidanceState,
    pub roi: ScanRoiDto,
    pub detected_box_area: Option<f64>,
    pub sharpness: f32,
    pub motion: f64,
    pub center_distance: Option<f64>,
    pub locked_candidate_id: Option<u32>,
    pub can_add_item: bool,
    pub hint: Option<String>,
}

impl ScanGuidanceState {
    /// `canAddItem` must hold iff state is LOCKED and a candidate is recorded.
    pub fn invariant_holds(&self) -> bool {
        self.can_add_item == (self.state == GuidanceState::Locked && self.locked_candidate_id.is_some())
    }
}

/// Serde-friendly mirror of `ScanRoi` (plain f64 fields, no derived methods)
/// so guidance snapshots can travel across the analyzer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanRoiDto {
    pub center_x_norm: f64,
    pub center_y_norm: f64,
    pub width_norm: f64,
    pub height_norm: f64,
}

impl From<ScanRoi> for ScanRoiDto {
    fn from(roi: ScanRoi) -> Self {
        Self {
            center_x_norm: roi.center_x_norm,
            center_y_norm: roi.center_y_norm,
            width_norm: roi.width_norm,
            height_norm: roi.height_norm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_rejects_locked_without_candidate() {
        let state = ScanGuidanceState {
            state: GuidanceState::Locked,
            roi: ScanRoiDto::from(ScanRoi::default_central()),
            detected_box_area: None,
            sharpness: 0.0,
            motion: 0.0,
            center_distance: None,
            locked_candidate_id: None,
            can_add_item: true,
            hint: None,
        };
        assert!(!state.invariant_holds());
    }

    #[test]
    fn invariant_holds_when_locked_with_candidate() {
        let state = ScanGuidanceState {
            state: GuidanceState::Locked,
            roi: ScanRoiDto::from(ScanRoi::default_central()),
            detected_box_area: Some(0.3),
            sharpness: 200.0,
            motion: 0.02,
            center_distance: Some(0.01),
            locked_candidate_id: Some(7),
            can_add_item: true,
            hint: None,
        };
        assert!(state.invariant_holds());
    }
}
