//! Live-scan detection pipeline: frame conversion, motion/sharpness
//! estimation, tracking, scan-guidance, and the per-frame orchestrator that
//! ties them together.
//!
//! This crate has no camera, ML backend, UI, or HTTP surface of its own —
//! those are external collaborators the host application supplies (see
//! `external`).

pub mod analyzer;
pub mod config;
pub mod coords;
pub mod error;
pub mod external;
pub mod frame_converter;
pub mod guidance;
pub mod motion;
pub mod router;
pub mod session;
pub mod sharpness;
pub mod tracker;

pub use analyzer::{FrameAnalyzer, FrameInput};
pub use config::ScanConfig;
pub use error::{ScanError, ScanResult};
pub use external::{DetectorBackend, DetectorOutput};
pub use frame_converter::{FrameConverter, PackedFrame, YuvFrame, YuvPlane};
pub use guidance::{BestCandidate, GuidanceManager};
pub use router::{DetectionRouter, RouterCounters};
pub use session::{Lifecycle, SessionController, StallReason};
pub use tracker::{ObjectTracker, TrackerInput};
