//! Peak finding, thresholding and debouncing over the averaged signal.
//!
//! The detector runs its own first-difference pass over the averaged buffer
//! and looks for sign changes of that rate-of-change series, per axis. Found
//! peaks must land in the newest portion of the buffer and exceed the axis
//! threshold; a combined onset is then gated by a refractory wait so one
//! physical gesture is never reported twice.

use crate::config::PeakConfig;
use crate::graph::derivative::DerivativeFilter;
use crate::sample::{is_no_data, Sample, ACCEL_CHANNELS};
use serde::{Deserialize, Serialize};

/// Acceleration axis attribution for a reported onset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Snapshot of a detector's outputs after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OnsetState {
    /// Whether a combined onset fired this tick.
    pub onset: bool,
    /// Normalized height of the strongest axis peak.
    pub magnitude: f64,
    /// Which axis that height came from.
    pub axis: Axis,
}

/// Tracks the refractory wait between reported onsets.
///
/// Driven entirely off the caller-supplied clock; before the first onset the
/// timer is vacuously ready.
struct PeakTimer {
    wait: f64,
    last_onset: Option<f64>,
}

impl PeakTimer {
    fn new(wait: f64) -> Self {
        Self {
            wait,
            last_onset: None,
        }
    }

    fn ready(&self, now: f64) -> bool {
        match self.last_onset {
            None => true,
            Some(t) => t + self.wait < now,
        }
    }

    fn mark(&mut self, now: f64) {
        self.last_onset = Some(now);
    }
}

/// Find local maxima of a signal from its first-difference series.
///
/// `diffs[j]` is `signal[j + 1] - signal[j]`; the scan covers `diffs[start..]`.
/// Returned indices are in signal space. Runs of equal values are collapsed
/// by skipping zero differences, so a plateau reports its trailing edge.
/// Boundary rules: a sub-window that opens mid-descent counts its first index
/// as a peak, and one that closes mid-ascent counts its last index.
fn find_peaks(diffs: &[f64], start: usize) -> Vec<usize> {
    if start >= diffs.len() {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    if !is_no_data(diffs[start]) && diffs[start] < 0.0 {
        candidates.push(start);
    }

    let sloped: Vec<usize> = (start..diffs.len())
        .filter(|&j| !is_no_data(diffs[j]) && diffs[j] != 0.0)
        .collect();
    for pair in sloped.windows(2) {
        if diffs[pair[0]] > 0.0 && diffs[pair[1]] < 0.0 {
            candidates.push(pair[1]);
        }
    }

    let last = diffs.len() - 1;
    if !is_no_data(diffs[last]) && diffs[last] > 0.0 {
        candidates.push(last + 1);
    }

    candidates
}

/// Normalize per-axis peak heights against their thresholds and pick the
/// dominant axis.
///
/// The comparison order is fixed: X against Y first, then the loser's branch
/// against Z. Downstream consumers key behavior off the reported axis, so
/// this precedence must not change.
fn normalized_peak(values: [f64; 3], thresholds: [f64; 3]) -> (f64, Axis) {
    let norm_x = (values[0] - thresholds[0]) / (1.0 - thresholds[0]);
    let norm_y = (values[1] - thresholds[1]) / (1.0 - thresholds[1]);
    let norm_z = (values[2] - thresholds[2]) / (1.0 - thresholds[2]);

    let mut peak = norm_x;
    let mut axis = Axis::X;
    if norm_x < norm_y {
        if norm_y < norm_z {
            peak = norm_z;
            axis = Axis::Z;
        } else {
            peak = norm_y;
            axis = Axis::Y;
        }
    } else if norm_x < norm_z {
        peak = norm_z;
        axis = Axis::Z;
    }

    if !peak.is_finite() {
        peak = 0.0;
    }
    (peak, axis)
}

/// Per-sensor gesture-onset detector.
pub struct OnsetDetector {
    config: PeakConfig,
    timer: PeakTimer,
    derivative: DerivativeFilter,
    pending_new: usize,
    onset: bool,
    magnitude: f64,
    axis: Axis,
}

impl OnsetDetector {
    pub fn new(config: PeakConfig) -> Self {
        let timer = PeakTimer::new(config.refractory_secs);
        let derivative = DerivativeFilter::new(config.min_buffer);
        Self {
            config,
            timer,
            derivative,
            pending_new: 0,
            onset: false,
            magnitude: 0.0,
            axis: Axis::X,
        }
    }

    /// Run one tick over the averaged upstream buffer.
    ///
    /// With insufficient history or nothing new since the last processed
    /// tick, the detector keeps its previous outputs; the refractory wait
    /// still counts against `now` because it is re-evaluated on the next
    /// processed tick.
    pub fn update(&mut self, averaged: &[Sample], upstream_new: usize, now: f64) {
        if averaged.len() < self.config.min_buffer {
            return;
        }
        self.pending_new += upstream_new;
        if self.pending_new == 0 {
            return;
        }

        let diff_buffer = self.derivative.process(averaged);
        if diff_buffer.is_empty() {
            return;
        }

        let start = diff_buffer
            .len()
            .saturating_sub(self.pending_new)
            .saturating_sub(self.config.edge_margin);
        let accept_from = start + self.config.edge_margin;

        let mut axis_values = [0.0f64; 3];
        let mut axis_fired = [false; 3];
        for (k, channel) in ACCEL_CHANNELS.iter().enumerate() {
            let diffs: Vec<f64> = diff_buffer.iter().map(|s| s.get(*channel)).collect();
            for index in find_peaks(&diffs, start) {
                if index < accept_from {
                    continue;
                }
                let value = averaged[index].get(*channel);
                if is_no_data(value) {
                    continue;
                }
                axis_values[k] = axis_values[k].max(value);
                if value > self.config.thresholds[k] {
                    axis_fired[k] = true;
                }
            }
        }

        let found = axis_fired.iter().any(|&fired| fired);
        let onset = found && self.timer.ready(now);
        if onset {
            self.timer.mark(now);
        }
        self.onset = onset;

        let (magnitude, axis) = normalized_peak(axis_values, self.config.thresholds);
        self.magnitude = magnitude;
        self.axis = axis;
        self.pending_new = 0;
    }

    /// Current outputs.
    pub fn state(&self) -> OnsetState {
        OnsetState {
            onset: self.onset,
            magnitude: self.magnitude,
            axis: self.axis,
        }
    }

    /// Current per-axis thresholds.
    pub fn thresholds(&self) -> [f64; 3] {
        self.config.thresholds
    }

    /// Replace the per-axis thresholds.
    pub fn set_thresholds(&mut self, thresholds: [f64; 3]) {
        self.config.thresholds = thresholds;
    }

    /// Nudge each axis threshold, for live calibration. Negative deltas
    /// lower a threshold.
    pub fn adjust_thresholds(&mut self, dx: f64, dy: f64, dz: f64) {
        self.config.thresholds[0] += dx;
        self.config.thresholds[1] += dy;
        self.config.thresholds[2] += dz;
    }
}
