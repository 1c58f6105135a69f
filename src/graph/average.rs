//! Trailing moving-average filter.

use crate::sample::{is_no_data, Sample, DERIVED_CHANNELS, NO_DATA};

/// Averages each channel over a trailing, causal window.
///
/// For input index `i` the window is the last `window` samples ending at and
/// including `i` (fewer near the start of the buffer). Sentinel values are
/// excluded from the mean; a window with no real values for a channel yields
/// the sentinel, never a division by zero.
pub struct AveragingFilter {
    window: usize,
    min_buffer: usize,
}

impl AveragingFilter {
    pub fn new(window: usize, min_buffer: usize) -> Self {
        Self { window, min_buffer }
    }

    /// Recompute the averaged buffer. Emits nothing until the upstream
    /// buffer has reached the minimum length.
    pub fn process(&self, upstream: &[Sample]) -> Vec<Sample> {
        if upstream.len() < self.min_buffer {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(upstream.len());
        for i in 0..upstream.len() {
            let start = (i + 1).saturating_sub(self.window.max(1));
            let mut sample = Sample::derived_from(&upstream[i]);
            for channel in DERIVED_CHANNELS {
                let mut sum = 0.0;
                let mut count = 0usize;
                for item in &upstream[start..=i] {
                    let value = item.get(channel);
                    if !is_no_data(value) {
                        sum += value;
                        count += 1;
                    }
                }
                let mean = if count == 0 { NO_DATA } else { sum / count as f64 };
                sample.set(channel, mean);
            }
            out.push(sample);
        }
        out
    }
}
