//! Per-frame luma-difference motion score on a sub-sampled grid.

/// Returned when no previous buffer is available yet, or after a reset.
const DEFAULT_MOTION_SCORE: f64 = 0.2;

/// Maintains two sub-sampled luma buffers and swaps between them each frame.
#[derive(Debug)]
pub struct MotionDetector {
    sample_step: u32,
    width: u32,
    height: u32,
    grid_w: usize,
    grid_h: usize,
    current: Vec<u8>,
    previous: Vec<u8>,
    has_previous: bool,
}

impl MotionDetector {
    pub fn new(sample_step: u32) -> Self {
        Self {
            sample_step: sample_step.max(1),
            width: 0,
            height: 0,
            grid_w: 0,
            grid_h: 0,
            current: Vec::new(),
            previous: Vec::new(),
            has_previous: false,
        }
    }

    /// Sub-samples `y_plane` (row-major, `row_stride` bytes per row), scores
    /// it against the previous frame, then swaps buffers.
    pub fn process(&mut self, y_plane: &[u8], width: u32, height: u32, row_stride: usize) -> f64 {
        if width != self.width || height != self.height {
            self.reset_dimensions(width, height);
        }

        let step = self.sample_step as usize;
        let mut idx = 0;
        let mut row = 0usize;
        while row < height as usize {
            let mut col = 0usize;
            while col < width as usize {
                let offset = row * row_stride + col;
                self.current[idx] = y_plane.get(offset).copied().unwrap_or(0);
                idx += 1;
                col += step;
            }
            row += step;
        }

        if !self.has_previous {
            self.swap();
            self.has_previous = true;
            return DEFAULT_MOTION_SCORE;
        }

        let n = self.current.len().max(1);
        let sum_abs_diff: u64 = self
            .current
            .iter()
            .zip(self.previous.iter())
            .map(|(&c, &p)| (c as i32 - p as i32).unsigned_abs() as u64)
            .sum();

        let score = sum_abs_diff as f64 / (n as f64 * 255.0);
        self.swap();
        score.clamp(0.0, 1.0)
    }

    /// Invalidates the previous buffer and returns to the configured default.
    pub fn reset(&mut self) {
        self.has_previous = false;
        self.previous.iter_mut().for_each(|b| *b = 0);
    }

    fn reset_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.grid_w = (width as usize).div_ceil(self.sample_step as usize).max(1);
        self.grid_h = (height as usize).div_ceil(self.sample_step as usize).max(1);
        let size = self.grid_w * self.grid_h;
        self.current = vec![0u8; size];
        self.previous = vec![0u8; size];
        self.has_previous = false;
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_returns_default_score() {
        let mut detector = MotionDetector::new(8);
        let plane = vec![128u8; 64 * 64];
        let score = detector.process(&plane, 64, 64, 64);
        assert_eq!(score, DEFAULT_MOTION_SCORE);
    }

    #[test]
    fn identical_frames_score_zero_motion() {
        let mut detector = MotionDetector::new(8);
        let plane = vec![128u8; 64 * 64];
        detector.process(&plane, 64, 64, 64);
        let score = detector.process(&plane, 64, 64, 64);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn score_is_always_in_unit_range() {
        let mut detector = MotionDetector::new(8);
        let a = vec![0u8; 64 * 64];
        let b = vec![255u8; 64 * 64];
        detector.process(&a, 64, 64, 64);
        let score = detector.process(&b, 64, 64, 64);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn reset_forces_default_on_next_frame() {
        let mut detector = MotionDetector::new(8);
        let plane = vec![128u8; 64 * 64];
        detector.process(&plane, 64, 64, 64);
        detector.reset();
        let score = detector.process(&plane, 64, 64, 64);
        assert_eq!(score, DEFAULT_MOTION_SCORE);
    }

    #[test]
    fn dimension_change_reinitializes_grid() {
        let mut detector = MotionDetector::new(8);
        let plane_a = vec![128u8; 64 * 64];
        detector.process(&plane_a, 64, 64, 64);
        let plane_b = vec![64u8; 32 * 32];
        let score = detector.process(&plane_b, 32, 32, 32);
        assert_eq!(score, DEFAULT_MOTION_SCORE);
    }
}
