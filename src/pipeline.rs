//! Per-sensor signal chains, measured entities, and the tick-driven engine.
//!
//! The engine is single-threaded and cooperative: an external driver calls
//! [`Engine::update`] once per frame with a monotonically increasing time.
//! Sample ingestion is decoupled through a channel handle and only ever
//! appends to buffers; all recomputation happens inside the tick.

use crate::config::{EngineConfig, SensorConfig};
use crate::graph::{
    Axis, AveragingFilter, DerivativeFilter, InputStage, NodeId, NodeKind, OnsetDetector,
    OnsetState, SignalGraph,
};
use crate::sample::{Sample, SampleBuffer};
use crate::skeleton::{ArmHeight, ContractionIndex, Skeleton};
use crate::telemetry::{FeatureFrame, FeatureRecord};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::info;
use uuid::Uuid;

/// Entity id given to sensors that register themselves on first sample.
pub const DEFAULT_ENTITY: &str = "performer-1";

/// One sensor's buffer plus its signal graph: input → average → derivative,
/// with the onset detector fed from the average.
pub struct SensorPipeline {
    id: String,
    buffer: SampleBuffer,
    graph: SignalGraph,
    average: NodeId,
    derivative: NodeId,
    onset: NodeId,
}

impl SensorPipeline {
    fn new(id: &str, buffer_capacity: usize, config: &SensorConfig) -> Self {
        let mut graph = SignalGraph::new();
        // Node ids are issued sequentially, so this static wiring cannot
        // reference a missing upstream.
        let input = graph
            .add(
                NodeKind::Input(InputStage::new(config.input_window)),
                [None, None],
            )
            .expect("input node has no upstream");
        let average = graph
            .add(
                NodeKind::Average(AveragingFilter::new(
                    config.average_window,
                    config.average_min_buffer,
                )),
                [Some(input), None],
            )
            .expect("average node follows input");
        let derivative = graph
            .add(
                NodeKind::Derivative(DerivativeFilter::new(config.derivative_min_buffer)),
                [Some(average), None],
            )
            .expect("derivative node follows average");
        let onset = graph
            .add(
                NodeKind::Onset(OnsetDetector::new(config.peak.clone())),
                [Some(average), None],
            )
            .expect("onset node follows average");

        Self {
            id: id.to_string(),
            buffer: SampleBuffer::new(buffer_capacity),
            graph,
            average,
            derivative,
            onset,
        }
    }

    fn append(&mut self, sample: Sample) {
        self.buffer.append(sample);
    }

    fn update(&mut self, now: f64) {
        self.graph.update(&self.buffer, now);
        self.buffer.reset_new_count();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The sensor's current averaged window, for visualization consumers.
    pub fn averaged(&self) -> &[Sample] {
        self.graph.output(self.average)
    }

    /// The sensor's current first-difference window.
    pub fn derivative(&self) -> &[Sample] {
        self.graph.output(self.derivative)
    }

    /// The onset detector's outputs after the last tick.
    pub fn onset_state(&self) -> OnsetState {
        self.graph.onset_state(self.onset).unwrap_or(OnsetState {
            onset: false,
            magnitude: 0.0,
            axis: Axis::X,
        })
    }

    /// Nudge the onset thresholds for live calibration.
    pub fn adjust_thresholds(&mut self, dx: f64, dy: f64, dz: f64) {
        if let NodeKind::Onset(detector) = self.graph.kind_mut(self.onset) {
            detector.adjust_thresholds(dx, dy, dz);
        }
    }

    /// Replace the onset thresholds.
    pub fn set_thresholds(&mut self, thresholds: [f64; 3]) {
        if let NodeKind::Onset(detector) = self.graph.kind_mut(self.onset) {
            detector.set_thresholds(thresholds);
        }
    }
}

/// One measured performer: their sensors, skeleton, and body measures.
pub struct Entity {
    id: String,
    sensors: Vec<SensorPipeline>,
    skeleton: Skeleton,
    contraction: ContractionIndex,
    arm_height: ArmHeight,
}

impl Entity {
    fn new(id: &str, config: &EngineConfig) -> Self {
        Self {
            id: id.to_string(),
            sensors: Vec::new(),
            skeleton: Skeleton::standard(),
            contraction: ContractionIndex::new(config.calibration.clone()),
            arm_height: ArmHeight::new(config.calibration.clone()),
        }
    }

    fn attach_sensor(&mut self, sensor_id: &str, buffer_capacity: usize, config: &SensorConfig) {
        if self.sensor(sensor_id).is_some() {
            return;
        }
        self.sensors
            .push(SensorPipeline::new(sensor_id, buffer_capacity, config));
    }

    pub fn sensor(&self, sensor_id: &str) -> Option<&SensorPipeline> {
        self.sensors.iter().find(|s| s.id == sensor_id)
    }

    pub fn sensor_mut(&mut self, sensor_id: &str) -> Option<&mut SensorPipeline> {
        self.sensors.iter_mut().find(|s| s.id == sensor_id)
    }

    fn update(&mut self, now: f64) {
        for sensor in &mut self.sensors {
            sensor.update(now);
        }

        // Sensors are keyed by bone name; feed each bound bone the latest
        // averaged relative angles.
        for sensor in &self.sensors {
            if !self.skeleton.has_bone(&sensor.id) {
                continue;
            }
            if let Some(latest) = sensor.averaged().last() {
                self.skeleton
                    .set_relative_angles(&sensor.id, latest.relative_angles());
            }
        }
        self.skeleton.update();

        self.contraction.update(&self.skeleton);
        self.arm_height.update(&self.skeleton);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn contraction(&self) -> &ContractionIndex {
        &self.contraction
    }

    pub fn arm_height(&self) -> &ArmHeight {
        &self.arm_height
    }

    pub fn sensors(&self) -> impl Iterator<Item = &SensorPipeline> {
        self.sensors.iter()
    }

    fn collect_records(&self, records: &mut Vec<FeatureRecord>) {
        for sensor in &self.sensors {
            let state = sensor.onset_state();
            records.push(FeatureRecord::Onset {
                entity: self.id.clone(),
                sensor: sensor.id.clone(),
                onset: state.onset,
                magnitude: state.magnitude,
                axis: state.axis,
            });
        }
        records.push(FeatureRecord::Contraction {
            entity: self.id.clone(),
            volume: self.contraction.volume(),
            index: self.contraction.index(),
        });
        records.push(FeatureRecord::ArmHeight {
            entity: self.id.clone(),
            combined: self.arm_height.combined(),
            left: self.arm_height.left(),
            right: self.arm_height.right(),
        });
    }
}

struct FeedMessage {
    sensor: String,
    sample: Sample,
}

/// Cloneable ingestion handle. Appending never blocks the tick; the engine
/// drains pending samples at the start of each update.
#[derive(Clone)]
pub struct SampleFeed {
    tx: Sender<FeedMessage>,
}

impl SampleFeed {
    pub fn append(&self, sensor_id: &str, sample: Sample) {
        let _ = self.tx.send(FeedMessage {
            sensor: sensor_id.to_string(),
            sample,
        });
    }
}

/// The streaming motion analysis engine.
pub struct Engine {
    config: EngineConfig,
    entities: Vec<Entity>,
    feed_tx: Sender<FeedMessage>,
    feed_rx: Receiver<FeedMessage>,
    instance_id: Uuid,
    now: f64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let (feed_tx, feed_rx) = unbounded();
        Self {
            config,
            entities: Vec::new(),
            feed_tx,
            feed_rx,
            instance_id: Uuid::new_v4(),
            now: 0.0,
        }
    }

    /// A handle other threads can use to deliver samples.
    pub fn feed(&self) -> SampleFeed {
        SampleFeed {
            tx: self.feed_tx.clone(),
        }
    }

    /// Attach a sensor to an entity with an explicit configuration,
    /// creating the entity on first use.
    pub fn attach_sensor(&mut self, entity_id: &str, sensor_id: &str, config: SensorConfig) {
        let capacity = self.config.buffer_capacity;
        let entity = self.ensure_entity(entity_id);
        entity.attach_sensor(sensor_id, capacity, &config);
    }

    /// Deliver one sample. Unknown sensors register themselves under the
    /// default entity with the engine's default sensor configuration.
    pub fn append_sample(&mut self, sensor_id: &str, sample: Sample) {
        if self.owning_entity(sensor_id).is_none() {
            info!(sensor = sensor_id, "auto-registering sensor");
            let sensor_config = self.config.sensor.clone();
            self.attach_sensor(DEFAULT_ENTITY, sensor_id, sensor_config);
        }
        if let Some(entity) = self.owning_entity_mut(sensor_id) {
            if let Some(pipeline) = entity.sensor_mut(sensor_id) {
                pipeline.append(sample);
            }
        }
    }

    /// Run one tick at caller time `now` (seconds, monotonic): drain pending
    /// ingestion, then recompute every node of every sensor in dependency
    /// order, then the skeletons and body measures.
    pub fn update(&mut self, now: f64) {
        self.now = now;

        let pending: Vec<FeedMessage> = self.feed_rx.try_iter().collect();
        for message in pending {
            self.append_sample(&message.sensor, message.sample);
        }

        for entity in &mut self.entities {
            entity.update(now);
        }
    }

    /// Flatten the current feature state into one exported frame.
    pub fn feature_frame(&self) -> FeatureFrame {
        let mut records = Vec::new();
        for entity in &self.entities {
            entity.collect_records(&mut records);
        }
        FeatureFrame::new(self.instance_id, self.now, records)
    }

    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == entity_id)
    }

    pub fn entity_mut(&mut self, entity_id: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == entity_id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    fn ensure_entity(&mut self, entity_id: &str) -> &mut Entity {
        if let Some(i) = self.entities.iter().position(|e| e.id == entity_id) {
            return &mut self.entities[i];
        }
        self.entities.push(Entity::new(entity_id, &self.config));
        let last = self.entities.len() - 1;
        &mut self.entities[last]
    }

    fn owning_entity(&self, sensor_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.sensor(sensor_id).is_some())
    }

    fn owning_entity_mut(&mut self, sensor_id: &str) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|e| e.sensor(sensor_id).is_some())
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
    fn test_unknown_sensor_auto_registers() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.append_sample("LeftHand", accel_sample(0.0, 0.1));

        let entity = engine.entity(DEFAULT_ENTITY).unwrap();
        assert!(entity.sensor("LeftHand").is_some());
    }

    #[test]
    fn test_feed_is_drained_on_update() {
        let mut engine = Engine::new(EngineConfig::default());
        let feed = engine.feed();
        for i in 0..20 {
            feed.append("RightHand", accel_sample(i as f64 * 0.02, 0.1));
        }

        engine.update(0.4);
        let entity = engine.entity(DEFAULT_ENTITY).unwrap();
        let sensor = entity.sensor("RightHand").unwrap();
        assert_eq!(sensor.averaged().len(), 20);
    }

    #[test]
    fn test_feature_frame_shape() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.attach_sensor("duo-a", "LeftHand", SensorConfig::default());
        engine.attach_sensor("duo-a", "RightHand", SensorConfig::default());
        engine.update(0.02);

        let frame = engine.feature_frame();
        // Two onset records plus contraction and arm height.
        assert_eq!(frame.records.len(), 4);
        assert!((frame.tick_time - 0.02).abs() < 1e-12);

        let onsets = frame
            .records
            .iter()
            .filter(|r| matches!(r, FeatureRecord::Onset { .. }))
            .count();
        assert_eq!(onsets, 2);
    }

    #[test]
    fn test_tick_without_new_samples_keeps_outputs() {
        let mut engine = Engine::new(EngineConfig::default());
        for i in 0..30 {
            engine.append_sample("LeftHand", accel_sample(i as f64 * 0.02, 0.2));
        }
        engine.update(0.6);
        let entity = engine.entity(DEFAULT_ENTITY).unwrap();
        let before = entity.sensor("LeftHand").unwrap().onset_state();
        let averaged_before = entity.sensor("LeftHand").unwrap().averaged().len();

        engine.update(0.62);
        let entity = engine.entity(DEFAULT_ENTITY).unwrap();
        assert_eq!(entity.sensor("LeftHand").unwrap().onset_state(), before);
        assert_eq!(
            entity.sensor("LeftHand").unwrap().averaged().len(),
            averaged_before
        );
    }

    #[test]
    fn test_relative_angles_drive_skeleton() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut config = SensorConfig::default();
        config.average_min_buffer = 2;
        engine.attach_sensor(DEFAULT_ENTITY, "LeftUpperArm", config);

        let rest = Skeleton::standard()
            .end_position("LeftUpperArm")
            .unwrap();

        for i in 0..10 {
            let mut s = Sample::new(i as f64 * 0.02, 9);
            s.set_accel(0.0, 0.0, 0.0);
            s.set_relative_angles(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
            engine.append_sample("LeftUpperArm", s);
        }
        engine.update(0.2);

        let entity = engine.entity(DEFAULT_ENTITY).unwrap();
        let end = entity.skeleton().end_position("LeftUpperArm").unwrap();
        assert!(end.distance(rest) > 0.1);
    }
}
