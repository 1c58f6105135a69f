//! Motion-sensor sample records and per-sensor buffering.
//!
//! Every producer (phone, inertial sensor, skeletal tracker) fills the same
//! fixed channel layout. Channels a device does not report hold the
//! [`NO_DATA`] sentinel, which downstream arithmetic must skip — it is a
//! reserved value, never a NaN.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sentinel for "channel not populated on this sample". Distinct from zero.
pub const NO_DATA: f64 = -9999.0;

/// Number of scalar value channels in a sample (quaternion kept separately).
pub const CHANNEL_COUNT: usize = 15;

/// Default retention cap for a sensor's buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Check whether a channel value is the "no data" sentinel.
#[inline]
pub fn is_no_data(value: f64) -> bool {
    value == NO_DATA
}

/// Scalar channel layout, shared by all sample producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(usize)]
pub enum Channel {
    AccelX = 0,
    AccelY = 1,
    AccelZ = 2,
    GyroX = 3,
    GyroY = 4,
    GyroZ = 5,
    BoneTilt = 6,
    BoneRotate = 7,
    BoneLateral = 8,
    RelativeTilt = 9,
    RelativeRotate = 10,
    RelativeLateral = 11,
    AngularVelTilt = 12,
    AngularVelRotate = 13,
    AngularVelLateral = 14,
}

/// Acceleration triple.
pub const ACCEL_CHANNELS: [Channel; 3] = [Channel::AccelX, Channel::AccelY, Channel::AccelZ];

/// Absolute bone-angle triple (tilt, rotate, lateral).
pub const BONE_ANGLE_CHANNELS: [Channel; 3] =
    [Channel::BoneTilt, Channel::BoneRotate, Channel::BoneLateral];

/// Parent-relative joint-angle triple (tilt, rotate, lateral).
pub const RELATIVE_ANGLE_CHANNELS: [Channel; 3] = [
    Channel::RelativeTilt,
    Channel::RelativeRotate,
    Channel::RelativeLateral,
];

/// Channels the smoothing and derivative filters operate on.
pub const DERIVED_CHANNELS: [Channel; 9] = [
    Channel::AccelX,
    Channel::AccelY,
    Channel::AccelZ,
    Channel::BoneTilt,
    Channel::BoneRotate,
    Channel::BoneLateral,
    Channel::RelativeTilt,
    Channel::RelativeRotate,
    Channel::RelativeLateral,
];

/// One motion-capture sample.
///
/// `timestamp` is in seconds on the caller's clock (the same clock that
/// drives the tick), not wall time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Arrival/record time in seconds, caller clock.
    pub timestamp: f64,
    /// Numeric id of the originating device.
    pub device_id: u32,
    values: [f64; CHANNEL_COUNT],
    quaternion: [f64; 4],
}

impl Sample {
    /// Create an empty sample: every channel holds the sentinel.
    pub fn new(timestamp: f64, device_id: u32) -> Self {
        Self {
            timestamp,
            device_id,
            values: [NO_DATA; CHANNEL_COUNT],
            quaternion: [NO_DATA; 4],
        }
    }

    /// Create an empty sample carrying another sample's timestamp and device
    /// id, used by filters that emit derived samples.
    pub fn derived_from(source: &Sample) -> Self {
        Self::new(source.timestamp, source.device_id)
    }

    /// Read one channel.
    #[inline]
    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel as usize]
    }

    /// Write one channel.
    #[inline]
    pub fn set(&mut self, channel: Channel, value: f64) {
        self.values[channel as usize] = value;
    }

    /// Whether a channel holds real data.
    #[inline]
    pub fn has(&self, channel: Channel) -> bool {
        !is_no_data(self.get(channel))
    }

    /// Set the acceleration triple.
    pub fn set_accel(&mut self, x: f64, y: f64, z: f64) {
        self.set(Channel::AccelX, x);
        self.set(Channel::AccelY, y);
        self.set(Channel::AccelZ, z);
    }

    /// Set the absolute bone-angle triple.
    pub fn set_bone_angles(&mut self, tilt: f64, rotate: f64, lateral: f64) {
        self.set(Channel::BoneTilt, tilt);
        self.set(Channel::BoneRotate, rotate);
        self.set(Channel::BoneLateral, lateral);
    }

    /// Set the relative joint-angle triple.
    pub fn set_relative_angles(&mut self, tilt: f64, rotate: f64, lateral: f64) {
        self.set(Channel::RelativeTilt, tilt);
        self.set(Channel::RelativeRotate, rotate);
        self.set(Channel::RelativeLateral, lateral);
    }

    /// The acceleration triple in x, y, z order.
    pub fn accel(&self) -> [f64; 3] {
        [
            self.get(Channel::AccelX),
            self.get(Channel::AccelY),
            self.get(Channel::AccelZ),
        ]
    }

    /// The relative joint-angle triple in tilt, rotate, lateral order.
    pub fn relative_angles(&self) -> [f64; 3] {
        [
            self.get(Channel::RelativeTilt),
            self.get(Channel::RelativeRotate),
            self.get(Channel::RelativeLateral),
        ]
    }

    /// Orientation quaternion (x, y, z, w), sentinel-filled when absent.
    pub fn quaternion(&self) -> [f64; 4] {
        self.quaternion
    }

    /// Store the orientation quaternion.
    pub fn set_quaternion(&mut self, q: [f64; 4]) {
        self.quaternion = q;
    }
}

/// Append-only, capacity-bounded store of one sensor's samples.
///
/// Arrival order is insertion order. The buffer tracks how many samples were
/// appended since the owning pipeline last read it; the pipeline resets the
/// count after every tick.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    new_samples: usize,
}

impl SampleBuffer {
    /// Create a buffer with the given retention cap.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
            capacity,
            new_samples: 0,
        }
    }

    /// Append one sample, trimming the oldest entries past capacity.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        self.new_samples += 1;
        self.trim(self.capacity);
    }

    /// Drop the oldest entries until at most `capacity` remain.
    pub fn trim(&mut self, capacity: usize) {
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
    }

    /// The last `n` samples in arrival order, or the whole buffer if it holds
    /// fewer. An empty buffer yields an empty iterator.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip)
    }

    /// Samples appended since the last [`reset_new_count`](Self::reset_new_count).
    pub fn new_count(&self) -> usize {
        self.new_samples
    }

    /// Mark the buffer as read by downstream.
    pub fn reset_new_count(&mut self) {
        self.new_samples = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accel_sample(t: f64, x: f64) -> Sample {
        let mut s = Sample::new(t, 1);
        s.set_accel(x, 0.0, 0.0);
        s
    }

    #[test]
    fn test_new_sample_is_all_sentinel() {
        let s = Sample::new(0.0, 0);
        for ch in DERIVED_CHANNELS {
            assert!(is_no_data(s.get(ch)));
            assert!(!s.has(ch));
        }
        assert!(s.quaternion().iter().all(|&q| is_no_data(q)));
    }

    #[test]
    fn test_derived_from_copies_identity_only() {
        let mut src = Sample::new(2.5, 7);
        src.set_accel(1.0, 2.0, 3.0);

        let d = Sample::derived_from(&src);
        assert_eq!(d.timestamp, 2.5);
        assert_eq!(d.device_id, 7);
        assert!(is_no_data(d.get(Channel::AccelX)));
    }

    #[test]
    fn test_buffer_latest_order() {
        let mut buf = SampleBuffer::new(8);
        for i in 0..5 {
            buf.append(accel_sample(i as f64, i as f64));
        }

        let last3: Vec<f64> = buf.latest(3).map(|s| s.get(Channel::AccelX)).collect();
        assert_eq!(last3, vec![2.0, 3.0, 4.0]);

        // Asking for more than the buffer holds returns everything.
        assert_eq!(buf.latest(100).count(), 5);
    }

    #[test]
    fn test_buffer_trims_oldest_past_capacity() {
        let mut buf = SampleBuffer::new(4);
        for i in 0..10 {
            buf.append(accel_sample(i as f64, i as f64));
        }

        assert_eq!(buf.len(), 4);
        let first = buf.latest(4).next().unwrap().get(Channel::AccelX);
        assert_eq!(first, 6.0);
    }

    #[test]
    fn test_new_count_reset() {
        let mut buf = SampleBuffer::new(16);
        buf.append(accel_sample(0.0, 0.0));
        buf.append(accel_sample(0.1, 1.0));
        assert_eq!(buf.new_count(), 2);

        buf.reset_new_count();
        assert_eq!(buf.new_count(), 0);

        buf.append(accel_sample(0.2, 2.0));
        assert_eq!(buf.new_count(), 1);
    }

    #[test]
    fn test_empty_buffer_reads_empty() {
        let buf = SampleBuffer::new(4);
        assert!(buf.is_empty());
        assert_eq!(buf.latest(10).count(), 0);
    }
}
