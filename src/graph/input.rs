//! Input stage: lifts raw buffered samples into the signal graph.

use crate::sample::{Channel, Sample, SampleBuffer};

/// Pulls the most recent window of raw samples from a sensor's buffer and
/// drops placeholder records that carry no acceleration data.
pub struct InputStage {
    window: usize,
}

impl InputStage {
    /// `window` is how many trailing raw samples to pull each tick.
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn process(&self, source: &SampleBuffer) -> Vec<Sample> {
        source
            .latest(self.window)
            .filter(|s| s.has(Channel::AccelX))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::NO_DATA;

    #[test]
    fn test_placeholder_samples_are_dropped() {
        let mut buf = SampleBuffer::new(16);

        let mut live = Sample::new(0.0, 1);
        live.set_accel(0.1, 0.2, 0.3);
        buf.append(live);
        // A record with no acceleration data at all.
        buf.append(Sample::new(0.02, 1));

        let stage = InputStage::new(8);
        let out = stage.process(&buf);
        assert_eq!(out.len(), 1);
        assert_ne!(out[0].get(Channel::AccelX), NO_DATA);
    }

    #[test]
    fn test_window_limits_pull() {
        let mut buf = SampleBuffer::new(64);
        for i in 0..10 {
            let mut s = Sample::new(i as f64, 1);
            s.set_accel(i as f64, 0.0, 0.0);
            buf.append(s);
        }

        let stage = InputStage::new(4);
        let out = stage.process(&buf);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].get(Channel::AccelX), 6.0);
    }
}
