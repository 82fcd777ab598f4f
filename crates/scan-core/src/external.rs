//! External collaborator interfaces (§6): the detector backend and camera
//! frame source are implemented by the host application. This crate only
//! specifies the boundary it calls across.

use scan_models::Detection;

use crate::error::ScanResult;

/// One call's worth of detector output: the per-object detections plus
/// whatever the host wants to draw as an overlay.
#[derive(Debug, Clone, Default)]
pub struct DetectorOutput {
    pub detections: Vec<Detection>,
}

/// Implemented by the host's ML backend (YOLO-style object detector,
/// barcode reader, document-text model, …). This crate treats it as an
/// opaque, out-of-scope collaborator — see §1 and §9 ("do not inherit UI or
/// ML machinery from the same hierarchy").
pub trait DetectorBackend: Send + Sync {
    /// `crop_rect`/`edge_inset_ratio` let the host focus inference on a
    /// sub-region; both are optional hints, not guarantees.
    fn detect(
        &self,
        image: &[u8],
        rotation_degrees: i32,
        use_stream_mode: bool,
        crop_rect: Option<scan_models::NormalizedRect>,
        edge_inset_ratio: Option<f32>,
    ) -> ScanResult<DetectorOutput>;
}
