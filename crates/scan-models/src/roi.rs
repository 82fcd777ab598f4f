use crate::rect::NormalizedRect;

/// The region of interest a candidate must lie inside to be lock-eligible.
///
/// Owned by the guidance manager; mutated only by it. Design default ships
/// a fixed central ROI (width≈0.7, height≈0.55) but the fields remain
/// independently mutable so an adaptive strategy could move it later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRoi {
    pub center_x_norm: f64,
    pub center_y_norm: f64,
    pub width_norm: f64,
    pub height_norm: f64,
}

impl ScanRoi {
    pub fn new(center_x_norm: f64, center_y_norm: f64, width_norm: f64, height_norm: f64) -> Self {
        Self {
            center_x_norm,
            center_y_norm,
            width_norm,
            height_norm,
        }
    }

    /// Fixed central ROI, width≈0.7 height≈0.55, as shipped by default.
    pub fn default_central() -> Self {
        Self::new(0.5, 0.5, 0.7, 0.55)
    }

    pub fn is_valid(&self) -> bool {
        self.width_norm > 0.0
            && self.width_norm <= 1.0
            && self.height_norm > 0.0
            && self.height_norm <= 1.0
            && self.as_rect().is_valid()
    }

    pub fn as_rect(&self) -> NormalizedRect {
        let half_w = self.width_norm / 2.0;
        let half_h = self.height_norm / 2.0;
        NormalizedRect::new(
            self.center_x_norm - half_w,
            self.center_y_norm - half_h,
            self.center_x_norm + half_w,
            self.center_y_norm + half_h,
        )
    }

    pub fn contains(&self, box_: &NormalizedRect) -> bool {
        self.as_rect().contains(box_)
    }

    /// Euclidean distance from ROI center to a normalized point, not scaled.
    pub fn center_distance(&self, point_x: f64, point_y: f64) -> f64 {
        let dx = point_x - self.center_x_norm;
        let dy = point_y - self.center_y_norm;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_central_is_valid_and_inside_unit_square() {
        let roi = ScanRoi::default_central();
        assert!(roi.is_valid());
        let rect = roi.as_rect();
        assert!(rect.left >= 0.0 && rect.right <= 1.0);
        assert!(rect.top >= 0.0 && rect.bottom <= 1.0);
    }

    #[test]
    fn contains_checks_against_derived_rect() {
        let roi = ScanRoi::default_central();
        let inside = NormalizedRect::new(0.4, 0.4, 0.6, 0.6);
        assert!(roi.contains(&inside));
    }
}
