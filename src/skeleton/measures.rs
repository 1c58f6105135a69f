//! Body-level expressivity measures over the current skeleton state.
//!
//! Each measure recomputes fully from the skeleton every tick and keeps only
//! its last computed values for readers; there is no history.

use crate::config::CalibrationConfig;
use crate::skeleton::{Skeleton, Vec3};

/// Rescale a raw measure into [0, 1] against a calibration range. A
/// degenerate range producing a non-finite ratio yields 0.
fn rescale(value: f64, min: f64, max: f64) -> f64 {
    let scaled = (value - min) / (max - min);
    if !scaled.is_finite() {
        return 0.0;
    }
    scaled.clamp(0.0, 1.0)
}

/// Bounding-cylinder volume over the bone end points, a proxy for how open
/// or closed the posture is.
///
/// The cylinder radius is the distance from the end point furthest to the
/// left of the hip anchor to the end point furthest from *it*; the height is
/// the topmost end point over the root anchor.
pub struct ContractionIndex {
    calibration: CalibrationConfig,
    volume: f64,
    index: f64,
}

impl ContractionIndex {
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self {
            calibration,
            volume: 0.0,
            index: 0.0,
        }
    }

    pub fn update(&mut self, skeleton: &Skeleton) {
        let Some(hip) = skeleton.anchor_position("Hip") else {
            return;
        };
        let Some(root) = skeleton.anchor_position("Root") else {
            return;
        };

        let points = skeleton.end_points();
        let Some(side) = points
            .iter()
            .copied()
            .max_by(|a, b| (hip.x - a.x).total_cmp(&(hip.x - b.x)))
        else {
            return;
        };
        let Some(far) = points
            .iter()
            .copied()
            .max_by(|a, b| side.distance(*a).total_cmp(&side.distance(*b)))
        else {
            return;
        };

        let radius = side.distance(far);
        let top = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let height = top - root.y;

        self.volume = std::f64::consts::PI * radius * radius * height;
        self.index = rescale(self.volume, self.calibration.volume_min, self.calibration.volume_max);
    }

    /// Raw cylinder volume, cubic meters.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Calibrated index in [0, 1].
    pub fn index(&self) -> f64 {
        self.index
    }
}

/// Vertical displacement of the arm segments relative to the hip, per side
/// and combined.
pub struct ArmHeight {
    calibration: CalibrationConfig,
    combined: f64,
    left: f64,
    right: f64,
}

impl ArmHeight {
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self {
            calibration,
            combined: 0.0,
            left: 0.0,
            right: 0.0,
        }
    }

    pub fn update(&mut self, skeleton: &Skeleton) {
        let Some(hip) = skeleton.anchor_position("Hip") else {
            return;
        };
        let anchor_y = |name: &str| skeleton.anchor_position(name).map(|p: Vec3| p.y);
        let (Some(left_upper), Some(left_fore), Some(right_upper), Some(right_fore)) = (
            anchor_y("LeftUpperArm"),
            anchor_y("LeftForeArm"),
            anchor_y("RightUpperArm"),
            anchor_y("RightForeArm"),
        ) else {
            return;
        };

        let left_raw = (left_upper - hip.y) + (left_fore - hip.y);
        let right_raw = (right_upper - hip.y) + (right_fore - hip.y);

        // The combined value is rescaled from the raw sums before either
        // side is rescaled with its own range.
        self.combined = rescale(
            left_raw + right_raw,
            self.calibration.arm_combined_min,
            self.calibration.arm_combined_max,
        );
        self.left = rescale(
            left_raw,
            self.calibration.arm_side_min,
            self.calibration.arm_side_max,
        );
        self.right = rescale(
            right_raw,
            self.calibration.arm_side_min,
            self.calibration.arm_side_max,
        );
    }

    pub fn combined(&self) -> f64 {
        self.combined
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }
}
