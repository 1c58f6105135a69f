//! Kinesia Core - streaming motion analysis for gesture-driven sound and
//! visuals.
//!
//! This library turns streaming motion-sensor samples (accelerometer,
//! gyroscope, and joint-angle channels) into smoothed signals, discrete
//! gesture onset events with magnitude and axis attribution, and body-level
//! expressivity measures over a reconstructed skeletal pose.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Kinesia Engine                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────┐   ┌────────────┐   ┌─────────┐  │
//! │  │  Sample  │──▶│ Average │─┬▶│ Derivative │   │ Feature │  │
//! │  │  Buffer  │   │ (window)│ │ └────────────┘ ┌▶│  Frame  │  │
//! │  └──────────┘   └─────────┘ │ ┌────────────┐ │ └─────────┘  │
//! │       ▲              │      └▶│   Onset    │─┤              │
//! │       │              ▼        │  Detector  │ │              │
//! │  ┌──────────┐   ┌──────────┐  └────────────┘ │              │
//! │  │  Sample  │   │ Skeleton │──▶ Body measures ┘              │
//! │  │   Feed   │   │   (FK)   │                                 │
//! │  └──────────┘   └──────────┘                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One driver thread calls [`Engine::update`] once per frame with a
//! monotonically increasing time; sample ingestion happens through
//! [`SampleFeed`] and never races the tick.
//!
//! # Example
//!
//! ```no_run
//! use kinesia_core::{Engine, EngineConfig, Sample};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//!
//! let mut sample = Sample::new(0.02, 1);
//! sample.set_accel(0.1, 0.0, 0.4);
//! engine.append_sample("LeftHand", sample);
//!
//! engine.update(0.02);
//! let frame = engine.feature_frame();
//! if frame.has_onset() {
//!     println!("gesture!");
//! }
//! ```

pub mod config;
pub mod graph;
pub mod pipeline;
pub mod sample;
pub mod skeleton;
pub mod telemetry;

// Re-export key types at crate root for convenience
pub use config::{CalibrationConfig, ConfigError, EngineConfig, PeakConfig, SensorConfig};
pub use graph::{Axis, OnsetState, SignalGraph};
pub use pipeline::{Engine, Entity, SampleFeed, SensorPipeline, DEFAULT_ENTITY};
pub use sample::{Channel, Sample, SampleBuffer, NO_DATA};
pub use skeleton::{ArmHeight, ContractionIndex, Skeleton, SkeletonError, Vec3};
pub use telemetry::{FeatureFrame, FeatureRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
