//! Tagged feature records for the export collaborator.
//!
//! After each tick the engine can flatten its per-sensor and per-entity
//! features into one list of records. The records derive `Serialize`; wire
//! formatting and transport are the consumer's business.

use crate::graph::Axis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One exported feature value set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureRecord {
    /// Per-sensor gesture onset state.
    Onset {
        entity: String,
        sensor: String,
        onset: bool,
        magnitude: f64,
        axis: Axis,
    },
    /// Per-entity posture openness.
    Contraction {
        entity: String,
        volume: f64,
        index: f64,
    },
    /// Per-entity arm elevation.
    ArmHeight {
        entity: String,
        combined: f64,
        left: f64,
        right: f64,
    },
}

/// A full tick's worth of feature records, stamped with the producing
/// engine's identity.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureFrame {
    /// Engine instance that produced this frame.
    pub instance_id: Uuid,
    /// Tick time on the caller's clock, seconds.
    pub tick_time: f64,
    /// Wall-clock time the frame was assembled.
    pub exported_at: DateTime<Utc>,
    pub records: Vec<FeatureRecord>,
}

impl FeatureFrame {
    pub fn new(instance_id: Uuid, tick_time: f64, records: Vec<FeatureRecord>) -> Self {
        Self {
            instance_id,
            tick_time,
            exported_at: Utc::now(),
            records,
        }
    }

    /// Whether any sensor reported an onset this tick.
    pub fn has_onset(&self) -> bool {
        self.records
            .iter()
            .any(|r| matches!(r, FeatureRecord::Onset { onset: true, .. }))
    }
}
