//! Error types for the scan pipeline.

use thiserror::Error;

/// Result type for scan-pipeline operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while converting, tracking, or guiding a frame.
///
/// Most variants are handled locally (§7): a frame-decode failure drops the
/// frame and continues, a transient detector failure does the same. Only
/// persistent detector failure and ROI assertions are meant to surface.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("frame buffer invalid: {0}")]
    FrameBufferInvalid(String),

    #[error("frame decode failed: {0}")]
    FrameDecodeError(String),

    #[error("detector error: {0}")]
    DetectorError(String),

    #[error("confirmed candidate {candidate_id} was outside the ROI at lock time")]
    RoiAssertion { candidate_id: u32 },

    #[error("callback arrived for stale session {stale_id}, current is {current_id}")]
    SessionMismatch { stale_id: u64, current_id: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn frame_buffer_invalid(message: impl Into<String>) -> Self {
        Self::FrameBufferInvalid(message.into())
    }

    pub fn detector_error(message: impl Into<String>) -> Self {
        Self::DetectorError(message.into())
    }

    /// Transient errors are worth retrying on the next frame; persistent
    /// ones (§7, "≥ N consecutive") should surface to the host.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScanError::FrameBufferInvalid(_)
                | ScanError::FrameDecodeError(_)
                | ScanError::DetectorError(_)
        )
    }
}
