//! Orchestrator that drives the scan pipeline for one frame (§4.7).
//!
//! Single-threaded cooperative at this level: callers must not invoke
//! `process_frame` again while a previous call is still in flight (§5). The
//! analyzer itself holds no suspension points; `DetectorBackend::detect` is
//! expected to do its own (potentially async/background-pool) work before
//! returning.

use scan_models::{CaptureType, Detection, FullFrameHandle, NormalizedRect, RawDetection, ScanMode, Session};

use crate::config::ScanConfig;
use crate::coords::{upright_to_sensor, Rotation};
use crate::error::{ScanError, ScanResult};
use crate::external::DetectorBackend;
use crate::guidance::{BestCandidate, GuidanceManager};
use crate::motion::MotionDetector;
use crate::sharpness::SharpnessEstimator;
use crate::tracker::{ObjectTracker, TrackerInput};

const THUMBNAIL_MAX_SIDE: u32 = 512;

/// One camera frame's worth of input. The Y plane drives motion/sharpness;
/// `sensor_bitmap` is the packed sensor-orientation buffer thumbnails are
/// cropped from (produced upstream by `FrameConverter`).
pub struct FrameInput<'a> {
    pub y_plane: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub rotation_degrees: i32,
    pub timestamp_ms: u64,
    pub sensor_bitmap: &'a [u8],
    pub sensor_bitmap_channels: usize,
}

/// Owns the per-frame pipeline state: motion history, tracker, guidance.
pub struct FrameAnalyzer {
    motion: MotionDetector,
    sharpness: SharpnessEstimator,
    tracker: ObjectTracker,
    guidance: GuidanceManager,
    config: ScanConfig,
    is_processing: bool,
    next_capture_id: u64,
}

impl FrameAnalyzer {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            motion: MotionDetector::new(config.motion_sample_step),
            sharpness: SharpnessEstimator::new(config.sharpness_window),
            tracker: ObjectTracker::new(),
            guidance: GuidanceManager::with_default_roi(),
            config,
            is_processing: false,
            next_capture_id: 1,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Drives (1)-(7) for one frame. Drops the frame (returns empty vectors)
    /// if a previous call is still in flight or the session has gone stale.
    pub fn process_frame(
        &mut self,
        frame: FrameInput<'_>,
        scan_mode: ScanMode,
        is_scanning: bool,
        detector: &dyn DetectorBackend,
        session: &Session,
        session_id: u64,
    ) -> ScanResult<(Vec<RawDetection>, Vec<Detection>)> {
        if self.is_processing {
            return Ok((Vec::new(), Vec::new()));
        }
        self.is_processing = true;
        let result = self.process_frame_inner(frame, scan_mode, is_scanning, detector, session, session_id);
        self.is_processing = false;
        result
    }

    fn process_frame_inner(
        &mut self,
        frame: FrameInput<'_>,
        scan_mode: ScanMode,
        is_scanning: bool,
        detector: &dyn DetectorBackend,
        session: &Session,
        session_id: u64,
    ) -> ScanResult<(Vec<RawDetection>, Vec<Detection>)> {
        let motion_score = self
            .motion
            .process(frame.y_plane, frame.width, frame.height, frame.row_stride);

        let rotation = Rotation::from_degrees(frame.rotation_degrees)
            .ok_or_else(|| ScanError::frame_buffer_invalid("unsupported rotation angle"))?;

        if scan_mode != ScanMode::ObjectDetection || !is_scanning {
            return self.single_shot_path(&frame, rotation, detector, session, session_id);
        }

        self.tracking_path(&frame, rotation, motion_score, detector, session, session_id)
    }

    fn single_shot_path(
        &mut self,
        frame: &FrameInput<'_>,
        rotation: Rotation,
        detector: &dyn DetectorBackend,
        session: &Session,
        session_id: u64,
    ) -> ScanResult<(Vec<RawDetection>, Vec<Detection>)> {
        let output = detector
            .detect(frame.sensor_bitmap, frame.rotation_degrees, false, None, None)
            .map_err(|e| ScanError::detector_error(e.to_string()))?;

        if !session.is_valid(session_id) {
            return Ok((Vec::new(), Vec::new()));
        }

        let capture_id = self.allocate_capture_id();
        let full_frame = FullFrameHandle {
            bytes: frame.sensor_bitmap.to_vec(),
            width: frame.width,
            height: frame.height,
        };

        let mut raw = Vec::with_capacity(output.detections.len());
        for detection in &output.detections {
            let thumbnail = self.crop_thumbnail(frame, rotation, &detection.box_upright);
            let mut rd = RawDetection::new(
                detection.box_upright,
                detection.confidence,
                &detection.label,
                &detection.category,
                0.0,
                CaptureType::SingleShot,
                capture_id,
            );
            rd.tracking_id = detection.tracking_id;
            rd.thumbnail = thumbnail;
            rd.full_frame = Some(full_frame.clone());
            raw.push(rd);
        }

        Ok((raw, output.detections))
    }

    fn tracking_path(
        &mut self,
        frame: &FrameInput<'_>,
        rotation: Rotation,
        motion_score: f64,
        detector: &dyn DetectorBackend,
        session: &Session,
        session_id: u64,
    ) -> ScanResult<(Vec<RawDetection>, Vec<Detection>)> {
        let output = detector
            .detect(frame.sensor_bitmap, frame.rotation_degrees, false, None, None)
            .map_err(|e| ScanError::detector_error(e.to_string()))?;

        if !session.is_valid(session_id) {
            return Ok((Vec::new(), Vec::new()));
        }

        let tracker_inputs: Vec<TrackerInput> = output
            .detections
            .iter()
            .map(|d| TrackerInput {
                box_upright: d.box_upright,
                confidence: d.confidence,
                label: d.label.clone(),
                category: d.category.clone(),
                backend_tracking_id: d.tracking_id,
            })
            .collect();

        self.tracker.process_frame(&tracker_inputs, &self.config);

        let sharpness_score = self
            .sharpness
            .score_y_plane(frame.y_plane, frame.width, frame.height, frame.row_stride);

        let tracked = self.tracker.confirmed_unconsumed(&self.config);
        let best = output
            .detections
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|d| {
                let id = tracked
                    .iter()
                    .find(|c| c.last_box.iou(&d.box_upright) > 0.5)
                    .map(|c| c.id)
                    .unwrap_or(0);
                BestCandidate {
                    id,
                    box_upright: d.box_upright,
                    confidence: d.confidence,
                }
            });

        let snapshot = self
            .guidance
            .update(best, motion_score, sharpness_score, frame.timestamp_ms, &self.config);

        let mut raw = Vec::new();
        if snapshot.can_add_item {
            let confirmed = self.tracker.confirmed_unconsumed(&self.config);
            let capture_id = self.allocate_capture_id();
            let full_frame = FullFrameHandle {
                bytes: frame.sensor_bitmap.to_vec(),
                width: frame.width,
                height: frame.height,
            };

            for candidate in confirmed {
                if !self.guidance.is_contained(&candidate) {
                    // ROI assertion: never commit, log as a bug (§7).
                    tracing::error!(candidate_id = candidate.id, "confirmed candidate outside ROI at lock time");
                    continue;
                }

                let thumbnail = self.crop_thumbnail(frame, rotation, &candidate.smoothed_box);
                let mut rd = RawDetection::new(
                    candidate.smoothed_box,
                    candidate.max_confidence,
                    &candidate.label,
                    &candidate.category,
                    candidate.best_sharpness,
                    CaptureType::Tracking,
                    capture_id,
                );
                rd.tracking_id = candidate.backend_tracking_id;
                rd.thumbnail = thumbnail;
                rd.full_frame = Some(full_frame.clone());
                raw.push(rd);

                self.tracker.mark_consumed(candidate.id);
            }
        }

        if !session.is_valid(session_id) {
            return Ok((Vec::new(), Vec::new()));
        }

        Ok((raw, output.detections))
    }

    fn allocate_capture_id(&mut self) -> u64 {
        let id = self.next_capture_id;
        self.next_capture_id += 1;
        id
    }

    /// Crops a thumbnail from the exact bounding box (no tightening), in
    /// sensor coordinates, then rotates it into display orientation and
    /// scales so `max(width,height) <= 512`.
    fn crop_thumbnail(
        &self,
        frame: &FrameInput<'_>,
        rotation: Rotation,
        upright_box: &NormalizedRect,
    ) -> Option<Vec<u8>> {
        if frame.sensor_bitmap.is_empty() {
            return None;
        }

        let sensor_box = upright_to_sensor(upright_box, rotation);
        let channels = frame.sensor_bitmap_channels.max(1);
        let width = frame.width as f64;
        let height = frame.height as f64;

        let left = (sensor_box.left.clamp(0.0, 1.0) * width) as usize;
        let top = (sensor_box.top.clamp(0.0, 1.0) * height) as usize;
        let right = ((sensor_box.right.clamp(0.0, 1.0) * width) as usize).max(left + 1);
        let bottom = ((sensor_box.bottom.clamp(0.0, 1.0) * height) as usize).max(top + 1);

        let crop_width = right.saturating_sub(left).min(frame.width as usize);
        let crop_height = bottom.saturating_sub(top).min(frame.height as usize);
        if crop_width == 0 || crop_height == 0 {
            return None;
        }

        let mut cropped = Vec::with_capacity(crop_width * crop_height * channels);
        for row in top..top + crop_height {
            let row_start = (row * frame.width as usize + left) * channels;
            let row_end = row_start + crop_width * channels;
            if row_end > frame.sensor_bitmap.len() {
                break;
            }
            cropped.extend_from_slice(&frame.sensor_bitmap[row_start..row_end]);
        }
        if cropped.len() != crop_width * crop_height * channels {
            return None;
        }

        let (rotated, rot_width, rot_height) = rotate_pixels(&cropped, crop_width, crop_height, channels, rotation);
        let (scaled, _, _) = downscale_to_max_side(&rotated, rot_width, rot_height, channels, THUMBNAIL_MAX_SIDE);
        Some(scaled)
    }
}

/// Rotates a packed pixel buffer from sensor orientation into display
/// (upright) orientation, using the same rotation the box mapping in
/// `coords.rs` applies to `NormalizedRect`s.
fn rotate_pixels(buf: &[u8], width: usize, height: usize, channels: usize, rotation: Rotation) -> (Vec<u8>, usize, usize) {
    match rotation {
        Rotation::Deg0 => (buf.to_vec(), width, height),
        Rotation::Deg180 => {
            let mut out = vec![0u8; buf.len()];
            for r in 0..height {
                for c in 0..width {
                    let src = (r * width + c) * channels;
                    let dst = ((height - 1 - r) * width + (width - 1 - c)) * channels;
                    out[dst..dst + channels].copy_from_slice(&buf[src..src + channels]);
                }
            }
            (out, width, height)
        }
        Rotation::Deg90 => {
            let new_width = height;
            let new_height = width;
            let mut out = vec![0u8; buf.len()];
            for r in 0..height {
                for c in 0..width {
                    let src = (r * width + c) * channels;
                    let dst_row = c;
                    let dst_col = height - 1 - r;
                    let dst = (dst_row * new_width + dst_col) * channels;
                    out[dst..dst + channels].copy_from_slice(&buf[src..src + channels]);
                }
            }
            (out, new_width, new_height)
        }
        Rotation::Deg270 => {
            let new_width = height;
            let new_height = width;
            let mut out = vec![0u8; buf.len()];
            for r in 0..height {
                for c in 0..width {
                    let src = (r * width + c) * channels;
                    let dst_row = width - 1 - c;
                    let dst_col = r;
                    let dst = (dst_row * new_width + dst_col) * channels;
                    out[dst..dst + channels].copy_from_slice(&buf[src..src + channels]);
                }
            }
            (out, new_width, new_height)
        }
    }
}

/// Nearest-neighbor downscale so `max(width, height) <= max_side`. A no-op
/// if the image is already within bounds.
fn downscale_to_max_side(buf: &[u8], width: usize, height: usize, channels: usize, max_side: u32) -> (Vec<u8>, usize, usize) {
    let max_dim = width.max(height) as u32;
    if max_dim <= max_side || width == 0 || height == 0 {
        return (buf.to_vec(), width, height);
    }

    let scale = max_side as f64 / max_dim as f64;
    let new_width = ((width as f64 * scale).round() as usize).max(1);
    let new_height = ((height as f64 * scale).round() as usize).max(1);

    let mut out = Vec::with_capacity(new_width * new_height * channels);
    for r in 0..new_height {
        let src_r = ((r as f64 / new_height as f64) * height as f64) as usize;
        let src_r = src_r.min(height - 1);
        for c in 0..new_width {
            let src_c = ((c as f64 / new_width as f64) * width as f64) as usize;
            let src_c = src_c.min(width - 1);
            let src = (src_r * width + src_c) * channels;
            out.extend_from_slice(&buf[src..src + channels]);
        }
    }
    (out, new_width, new_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::DetectorOutput;

    struct StubDetector {
        detections: Vec<Detection>,
    }

    impl DetectorBackend for StubDetector {
        fn detect(
            &self,
            _image: &[u8],
            _rotation_degrees: i32,
            _use_stream_mode: bool,
            _crop_rect: Option<NormalizedRect>,
            _edge_inset_ratio: Option<f32>,
        ) -> ScanResult<DetectorOutput> {
            Ok(DetectorOutput {
                detections: self.detections.clone(),
            })
        }
    }

    fn sample_frame(bitmap: &[u8], y_plane: &[u8]) -> FrameInput<'_> {
        FrameInput {
            y_plane,
            width: 64,
            height: 64,
            row_stride: 64,
            rotation_degrees: 0,
            timestamp_ms: 0,
            sensor_bitmap: bitmap,
            sensor_bitmap_channels: 4,
        }
    }

    #[test]
    fn isscanning_false_does_not_touch_tracker_state() {
        let mut analyzer = FrameAnalyzer::new(ScanConfig::default());
        let detector = StubDetector {
            detections: vec![Detection::new(
                NormalizedRect::new(0.3, 0.3, 0.7, 0.7),
                0.8,
                "electronics",
                "phone",
            )],
        };
        let session = Session::new();
        let id = session.start();
        let bitmap = vec![0u8; 64 * 64 * 4];
        let y_plane = vec![128u8; 64 * 64];

        analyzer
            .process_frame(
                sample_frame(&bitmap, &y_plane),
                ScanMode::ObjectDetection,
                false,
                &detector,
                &session,
                id,
            )
            .unwrap();

        assert_eq!(analyzer.tracker.active_track_count(), 0);
    }

    #[test]
    fn single_shot_path_shares_one_capture_id() {
        let mut analyzer = FrameAnalyzer::new(ScanConfig::default());
        let detector = StubDetector {
            detections: vec![
                Detection::new(NormalizedRect::new(0.1, 0.1, 0.3, 0.3), 0.7, "a", "a"),
                Detection::new(NormalizedRect::new(0.5, 0.5, 0.8, 0.8), 0.6, "b", "b"),
            ],
        };
        let session = Session::new();
        let id = session.start();
        let bitmap = vec![0u8; 64 * 64 * 4];
        let y_plane = vec![128u8; 64 * 64];

        let (raw, _) = analyzer
            .process_frame(
                sample_frame(&bitmap, &y_plane),
                ScanMode::Barcode,
                true,
                &detector,
                &session,
                id,
            )
            .unwrap();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].capture_id, raw[1].capture_id);
        assert!(raw.iter().all(|r| r.capture_type == CaptureType::SingleShot));
    }

    #[test]
    fn stale_session_drops_results() {
        let mut analyzer = FrameAnalyzer::new(ScanConfig::default());
        let detector = StubDetector {
            detections: vec![Detection::new(NormalizedRect::new(0.1, 0.1, 0.3, 0.3), 0.7, "a", "a")],
        };
        let session = Session::new();
        let id = session.start();
        session.stop();
        let bitmap = vec![0u8; 64 * 64 * 4];
        let y_plane = vec![128u8; 64 * 64];

        let (raw, _) = analyzer
            .process_frame(
                sample_frame(&bitmap, &y_plane),
                ScanMode::Barcode,
                true,
                &detector,
                &session,
                id,
            )
            .unwrap();

        assert!(raw.is_empty());
    }

    fn checkerboard_y_plane(width: usize, height: usize) -> Vec<u8> {
        let mut plane = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                plane[y * width + x] = if (x + y) % 2 == 0 { 255 } else { 0 };
            }
        }
        plane
    }

    /// §8 S1: a single steady, centered, in-focus detection fed across a
    /// stream of frames should dwell through GOOD, lock, and emit exactly
    /// one tracking-type `RawDetection` with the candidate marked consumed.
    #[test]
    fn steady_candidate_locks_and_emits_exactly_once() {
        let mut config = ScanConfig::default();
        config.sharpness_window = 16;
        config.sharpness_threshold = 10.0;
        let mut analyzer = FrameAnalyzer::new(config);

        let width = 64u32;
        let height = 64u32;
        let y_plane = checkerboard_y_plane(width as usize, height as usize);
        let bitmap = vec![0u8; width as usize * height as usize * 4];

        let detector = StubDetector {
            detections: vec![Detection::new(NormalizedRect::new(0.3, 0.3, 0.7, 0.7), 0.8, "electronics", "phone")],
        };
        let session = Session::new();
        let id = session.start();

        let mut all_raw = Vec::new();
        for frame_index in 0..20u64 {
            let frame = FrameInput {
                y_plane: &y_plane,
                width,
                height,
                row_stride: width as usize,
                rotation_degrees: 0,
                timestamp_ms: frame_index * 50,
                sensor_bitmap: &bitmap,
                sensor_bitmap_channels: 4,
            };
            let (raw, _) = analyzer
                .process_frame(frame, ScanMode::ObjectDetection, true, &detector, &session, id)
                .unwrap();
            all_raw.extend(raw);
        }

        assert_eq!(all_raw.len(), 1, "expected exactly one RawDetection across the stream");
        assert_eq!(all_raw[0].capture_type, CaptureType::Tracking);
        assert_eq!(analyzer.tracker.confirmed_unconsumed(&analyzer.config).len(), 0);
    }

    /// §8 S3: a thumbnail cropped through a rotation must come out in
    /// display orientation, not raw sensor orientation. Paints a marker at
    /// the upright box's top-left corner, converts it into sensor space the
    /// same way the detector's box would be, and checks the marker lands at
    /// the rotated thumbnail's top-left rather than anywhere else.
    #[test]
    fn rotation_90_thumbnail_puts_marker_in_upright_orientation() {
        let analyzer = FrameAnalyzer::new(ScanConfig::default());
        let width = 64usize;
        let height = 64usize;
        let channels = 1usize;
        let mut bitmap = vec![0u8; width * height * channels];

        let upright_box = NormalizedRect::new(0.1, 0.2, 0.4, 0.6);
        let marker_upright = NormalizedRect::new(0.1, 0.2, 0.15, 0.25);
        let marker_sensor = upright_to_sensor(&marker_upright, Rotation::Deg90);

        let paint = |bitmap: &mut [u8], rect: &NormalizedRect, value: u8| {
            let left = (rect.left.clamp(0.0, 1.0) * width as f64) as usize;
            let top = (rect.top.clamp(0.0, 1.0) * height as f64) as usize;
            let right = ((rect.right.clamp(0.0, 1.0) * width as f64) as usize).max(left + 1).min(width);
            let bottom = ((rect.bottom.clamp(0.0, 1.0) * height as f64) as usize).max(top + 1).min(height);
            for row in top..bottom {
                for col in left..right {
                    bitmap[row * width + col] = value;
                }
            }
        };
        paint(&mut bitmap, &marker_sensor, 255);

        let y_plane = vec![128u8; width * height];
        let frame = FrameInput {
            y_plane: &y_plane,
            width: width as u32,
            height: height as u32,
            row_stride: width,
            rotation_degrees: 90,
            timestamp_ms: 0,
            sensor_bitmap: &bitmap,
            sensor_bitmap_channels: channels,
        };

        let thumbnail = analyzer
            .crop_thumbnail(&frame, Rotation::Deg90, &upright_box)
            .expect("thumbnail should be produced");

        let sensor_box = upright_to_sensor(&upright_box, Rotation::Deg90);
        let left = (sensor_box.left.clamp(0.0, 1.0) * width as f64) as usize;
        let top = (sensor_box.top.clamp(0.0, 1.0) * height as f64) as usize;
        let right = ((sensor_box.right.clamp(0.0, 1.0) * width as f64) as usize).max(left + 1);
        let bottom = ((sensor_box.bottom.clamp(0.0, 1.0) * height as f64) as usize).max(top + 1);
        let crop_width = right.saturating_sub(left).min(width);
        let crop_height = bottom.saturating_sub(top).min(height);
        // Deg90 swaps dimensions when rotating sensor-space pixels into
        // upright/display orientation.
        let out_width = crop_height.max(1);
        let out_height = crop_width.max(1);
        assert_eq!(thumbnail.len(), out_width * out_height * channels);

        // A marker pixel well inside the painted region and a background
        // pixel well outside it, both inside the crop, mapped through the
        // same index transform `rotate_pixels` applies for Deg90: the
        // source row/col within the crop become (col, crop_height-1-row) in
        // the output.
        let marker_src_row = 56 - top;
        let marker_src_col = 13 - left;
        let marker_dst = (marker_src_col, crop_height - 1 - marker_src_row);

        let bg_src_row = 40 - top;
        let bg_src_col = 30 - left;
        let bg_dst = (bg_src_col, crop_height - 1 - bg_src_row);

        let pixel_at = |row: usize, col: usize| thumbnail[row * out_width + col];

        assert_eq!(
            pixel_at(marker_dst.0, marker_dst.1),
            255,
            "marker pixel should survive the crop+rotate at its mapped destination"
        );
        assert_eq!(
            pixel_at(bg_dst.0, bg_dst.1),
            0,
            "background pixel should remain background at its mapped destination"
        );
    }
}
