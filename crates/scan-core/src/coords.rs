//! Upright ↔ sensor coordinate mapping (§4.7).
//!
//! Boxes returned by the detector are always upright-normalized. To crop a
//! thumbnail from the sensor-orientation bitmap, the box must first be
//! mapped back into sensor space using the inverse of the sensor's upright
//! rotation.

use scan_models::NormalizedRect;

/// Sensor→upright rotation angle, one of the four values the camera source
/// can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Maps an upright-normalized box to sensor-normalized space, per the table
/// in §4.7.
pub fn upright_to_sensor(upright: &NormalizedRect, rotation: Rotation) -> NormalizedRect {
    let (l, t, r, b) = (upright.left, upright.top, upright.right, upright.bottom);
    match rotation {
        Rotation::Deg0 => NormalizedRect::new(l, t, r, b),
        Rotation::Deg90 => NormalizedRect::new(t, 1.0 - r, b, 1.0 - l),
        Rotation::Deg180 => NormalizedRect::new(1.0 - r, 1.0 - b, 1.0 - l, 1.0 - t),
        Rotation::Deg270 => NormalizedRect::new(1.0 - b, l, 1.0 - t, r),
    }
}

/// Inverse of `upright_to_sensor`: maps a sensor-normalized box back to
/// upright space. Used to re-measure a crop for round-trip verification.
pub fn sensor_to_upright(sensor: &NormalizedRect, rotation: Rotation) -> NormalizedRect {
    let (l, t, r, b) = (sensor.left, sensor.top, sensor.right, sensor.bottom);
    match rotation {
        Rotation::Deg0 => NormalizedRect::new(l, t, r, b),
        Rotation::Deg90 => NormalizedRect::new(1.0 - b, l, 1.0 - t, r),
        Rotation::Deg180 => NormalizedRect::new(1.0 - r, 1.0 - b, 1.0 - l, 1.0 - t),
        Rotation::Deg270 => NormalizedRect::new(t, 1.0 - r, b, 1.0 - l),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &NormalizedRect, b: &NormalizedRect) {
        let eps = 1e-9;
        assert!((a.left - b.left).abs() < eps, "{:?} vs {:?}", a, b);
        assert!((a.top - b.top).abs() < eps, "{:?} vs {:?}", a, b);
        assert!((a.right - b.right).abs() < eps, "{:?} vs {:?}", a, b);
        assert!((a.bottom - b.bottom).abs() < eps, "{:?} vs {:?}", a, b);
    }

    #[test]
    fn round_trip_holds_for_every_rotation() {
        let upright = NormalizedRect::new(0.1, 0.2, 0.4, 0.6);
        for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
            let sensor = upright_to_sensor(&upright, rotation);
            let back = sensor_to_upright(&sensor, rotation);
            assert_close(&upright, &back);
        }
    }

    #[test]
    fn rotation_90_matches_table() {
        let upright = NormalizedRect::new(0.1, 0.2, 0.4, 0.6);
        let sensor = upright_to_sensor(&upright, Rotation::Deg90);
        assert_close(&sensor, &NormalizedRect::new(0.2, 0.6, 0.6, 0.9));
    }

    #[test]
    fn from_degrees_rejects_non_right_angles() {
        assert!(Rotation::from_degrees(45).is_none());
        assert!(Rotation::from_degrees(90).is_some());
        assert!(Rotation::from_degrees(-90).is_some());
    }
}
