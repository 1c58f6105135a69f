//! Discrete first-difference filter.

use crate::sample::{is_no_data, Sample, DERIVED_CHANNELS, NO_DATA};

/// Emits per-channel first differences of its upstream buffer.
///
/// Output `j` holds `upstream[j + 1] - upstream[j]` and carries the identity
/// of `upstream[j + 1]`; the first input index produces no output since it
/// has no predecessor. If either operand is the sentinel the difference is
/// the sentinel.
pub struct DerivativeFilter {
    min_buffer: usize,
}

impl DerivativeFilter {
    pub fn new(min_buffer: usize) -> Self {
        Self { min_buffer }
    }

    pub fn process(&self, upstream: &[Sample]) -> Vec<Sample> {
        if upstream.len() < self.min_buffer {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(upstream.len().saturating_sub(1));
        for i in 1..upstream.len() {
            let mut sample = Sample::derived_from(&upstream[i]);
            for channel in DERIVED_CHANNELS {
                let current = upstream[i].get(channel);
                let previous = upstream[i - 1].get(channel);
                let diff = if is_no_data(current) || is_no_data(previous) {
                    NO_DATA
                } else {
                    current - previous
                };
                sample.set(channel, diff);
            }
            out.push(sample);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Channel;

    fn samples(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut s = Sample::new(i as f64 * 0.02, 1);
                s.set_accel(v, 0.0, 0.0);
                s
            })
            .collect()
    }

    #[test]
    fn test_first_differences() {
        let filter = DerivativeFilter::new(1);
        let input = samples(&[0.0, 1.0, 3.0, 2.0]);
        let out = filter.process(&input);

        let diffs: Vec<f64> = out.iter().map(|s| s.get(Channel::AccelX)).collect();
        assert_eq!(diffs, vec![1.0, 2.0, -1.0]);
        assert_eq!(out.len(), input.len() - 1);
    }

    #[test]
    fn test_no_output_below_min_buffer() {
        let filter = DerivativeFilter::new(8);
        let input = samples(&[0.0, 1.0, 2.0]);
        assert!(filter.process(&input).is_empty());
    }

    #[test]
    fn test_sentinel_operand_propagates() {
        let filter = DerivativeFilter::new(1);
        let mut input = samples(&[0.0, 1.0, 2.0]);
        input[1].set(Channel::AccelX, NO_DATA);

        let out = filter.process(&input);
        assert!(is_no_data(out[0].get(Channel::AccelX)));
        assert!(is_no_data(out[1].get(Channel::AccelX)));
        // Untouched axes still difference normally (both operands sentinel
        // on the bone channels, so those stay sentinel too).
        assert_eq!(out[0].get(Channel::AccelY), 0.0);
    }

    #[test]
    fn test_identity_comes_from_newer_sample() {
        let filter = DerivativeFilter::new(1);
        let input = samples(&[0.0, 1.0]);
        let out = filter.process(&input);
        assert_eq!(out[0].timestamp, input[1].timestamp);
    }
}
