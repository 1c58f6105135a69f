//! Configuration for the motion analysis engine.
//!
//! Every tunable that used to be a baked-in constant in earlier prototypes
//! (window sizes, thresholds, refractory wait, calibration ranges) lives here
//! and is handed to each component at construction time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Nominal sample rate of the supported sensors, in Hz. Used only as the
/// default replay cadence; the engine itself is driven by caller time.
pub const NOMINAL_SAMPLE_RATE: f64 = 50.0;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retention cap for each sensor's raw sample buffer.
    pub buffer_capacity: usize,
    /// Defaults applied to sensors that auto-register on first sample.
    pub sensor: SensorConfig,
    /// Calibration ranges for the body measures.
    pub calibration: CalibrationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
            sensor: SensorConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

/// Per-sensor signal-chain configuration, supplied at attach time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// How many recent raw samples the input stage pulls each tick.
    pub input_window: usize,
    /// Trailing window of the averaging filter.
    pub average_window: usize,
    /// Minimum input length before the averaging filter emits anything.
    pub average_min_buffer: usize,
    /// Minimum input length before the derivative filter emits anything.
    pub derivative_min_buffer: usize,
    /// Onset detector settings.
    pub peak: PeakConfig,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            input_window: 48,
            average_window: 3,
            average_min_buffer: 16,
            derivative_min_buffer: 16,
            peak: PeakConfig::default(),
        }
    }
}

/// Onset-detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakConfig {
    /// Per-axis peak thresholds on the averaged signal (x, y, z).
    pub thresholds: [f64; 3],
    /// Minimum seconds between two reported combined onsets.
    pub refractory_secs: f64,
    /// Minimum averaged-buffer length before the detector runs.
    pub min_buffer: usize,
    /// Scan margin before the newest samples, so peaks spanning the old/new
    /// boundary are still found; accepted peaks must lie past it.
    pub edge_margin: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            thresholds: [0.6, 0.6, 0.6],
            refractory_secs: 0.3,
            min_buffer: 10,
            edge_margin: 4,
        }
    }
}

/// Calibration ranges used to rescale raw body measures into [0, 1].
///
/// The defaults suit a single adult performer with the standard bone table;
/// installations with different rigs should measure their own extremes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Observed bounding-cylinder volume range, cubic meters.
    pub volume_min: f64,
    pub volume_max: f64,
    /// Observed combined (left + right) arm-height sum range, meters.
    pub arm_combined_min: f64,
    pub arm_combined_max: f64,
    /// Observed single-side arm-height sum range, meters.
    pub arm_side_min: f64,
    pub arm_side_max: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            volume_min: 0.0,
            volume_max: 6.0,
            arm_combined_min: 0.0,
            arm_combined_max: 3.0,
            arm_side_min: 0.0,
            arm_side_max: 1.5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: EngineConfig = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kinesia")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_capacity, 1024);
        assert_eq!(config.sensor.average_window, 3);
        assert_eq!(config.sensor.peak.thresholds, [0.6, 0.6, 0.6]);
        assert!((config.sensor.peak.refractory_secs - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sensor.input_window, config.sensor.input_window);
        assert_eq!(back.calibration.volume_max, config.calibration.volume_max);
    }

    #[test]
    fn test_calibration_ranges_are_ordered() {
        let c = CalibrationConfig::default();
        assert!(c.volume_min < c.volume_max);
        assert!(c.arm_combined_min < c.arm_combined_max);
        assert!(c.arm_side_min < c.arm_side_max);
    }
}
