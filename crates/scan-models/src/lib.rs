//! Shared value types for the live-scan detection pipeline.
//!
//! This crate has no behavior of its own: it defines the entities the
//! frame converter, motion/sharpness estimators, tracker, guidance manager,
//! router, and analyzer pass between each other, so those crates can stay
//! decoupled from one another's internals.

pub mod detection;
pub mod events;
pub mod guidance;
pub mod raw_detection;
pub mod rect;
pub mod roi;
pub mod session;
pub mod track;

pub use detection::{CaptureType, Detection, ScanMode};
pub use events::{DetectionEvent, EventHeader};
pub use guidance::{GuidanceState, ScanGuidanceState, ScanRoiDto};
pub use raw_detection::{FullFrameHandle, RawDetection};
pub use rect::NormalizedRect;
pub use roi::ScanRoi;
pub use session::Session;
pub use track::TrackCandidate;
