//! End-to-end engine scenarios: onset detection on recorded-style streams,
//! debouncing, quiescent behavior, and the skeleton-driven measures.

use kinesia_core::{
    Axis, Engine, EngineConfig, FeatureRecord, OnsetState, PeakConfig, Sample, SensorConfig,
    DEFAULT_ENTITY,
};

fn scenario_config(refractory_secs: f64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.sensor = SensorConfig {
        input_window: 48,
        average_window: 3,
        average_min_buffer: 2,
        derivative_min_buffer: 2,
        peak: PeakConfig {
            thresholds: [0.6, 0.6, 0.6],
            refractory_secs,
            min_buffer: 2,
            edge_margin: 4,
        },
    };
    config
}

/// Feed one x-axis value per tick at `dt` spacing and record every tick
/// where the sensor reported a combined onset.
fn drive_x_axis(
    engine: &mut Engine,
    sensor: &str,
    values: &[f64],
    dt: f64,
) -> Vec<(f64, OnsetState)> {
    drive_x_axis_from(engine, sensor, values, dt, 0.0)
}

fn drive_x_axis_from(
    engine: &mut Engine,
    sensor: &str,
    values: &[f64],
    dt: f64,
    start: f64,
) -> Vec<(f64, OnsetState)> {
    let mut onsets = Vec::new();
    for (i, &x) in values.iter().enumerate() {
        let now = start + i as f64 * dt;
        let mut sample = Sample::new(now, 1);
        sample.set_accel(x, 0.0, 0.0);
        engine.append_sample(sensor, sample);
        engine.update(now);

        let state = engine
            .entity(DEFAULT_ENTITY)
            .unwrap()
            .sensor(sensor)
            .unwrap()
            .onset_state();
        if state.onset {
            onsets.push((now, state));
        }
    }
    onsets
}

#[test]
fn test_single_gesture_reports_one_onset() {
    let mut engine = Engine::new(scenario_config(0.3));
    let values = [0.0, 0.2, 0.9, 0.95, 0.3, 0.05];
    let onsets = drive_x_axis(&mut engine, "LeftHand", &values, 0.05);

    assert_eq!(onsets.len(), 1, "expected exactly one onset: {onsets:?}");
    let (time, state) = onsets[0];
    // Fires where the local maximum first clears the threshold, not on the
    // still-elevated following sample.
    assert!((time - 0.20).abs() < 1e-9);
    assert_eq!(state.axis, Axis::X);
    assert!(state.magnitude > 0.0);
}

#[test]
fn test_debounce_under_and_over_the_refractory_wait() {
    let values = [
        0.0, 0.2, 0.9, 0.95, 0.3, 0.05, 0.2, 0.9, 0.95, 0.3, 0.05, 0.0,
    ];

    // Two genuine peaks about 0.2 s apart; a 0.3 s wait merges them.
    let mut engine = Engine::new(scenario_config(0.3));
    let onsets = drive_x_axis(&mut engine, "LeftHand", &values, 0.05);
    assert_eq!(onsets.len(), 1, "wait should swallow the second peak: {onsets:?}");

    // A 0.1 s wait lets both through.
    let mut engine = Engine::new(scenario_config(0.1));
    let onsets = drive_x_axis(&mut engine, "LeftHand", &values, 0.05);
    assert_eq!(onsets.len(), 2, "both peaks should report: {onsets:?}");
}

#[test]
fn test_update_without_new_samples_changes_nothing() {
    let mut engine = Engine::new(scenario_config(0.3));
    let values = [0.0, 0.2, 0.9, 0.95, 0.3, 0.05];
    drive_x_axis(&mut engine, "LeftHand", &values, 0.05);

    let baseline = engine.feature_frame().records;

    // Two further ticks with zero newly appended samples.
    engine.update(0.30);
    engine.update(0.35);

    let after = engine.feature_frame().records;
    assert_eq!(baseline, after);
}

#[test]
fn test_relative_angles_raise_the_measures() {
    let mut engine = Engine::new(EngineConfig::default());
    let mut sensor_config = SensorConfig::default();
    sensor_config.average_min_buffer = 2;
    engine.attach_sensor(DEFAULT_ENTITY, "LeftUpperArm", sensor_config.clone());
    engine.attach_sensor(DEFAULT_ENTITY, "RightUpperArm", sensor_config);

    engine.update(0.0);
    let rest_arm = engine
        .entity(DEFAULT_ENTITY)
        .unwrap()
        .arm_height()
        .combined();

    // Both upper arms tilt up toward vertical.
    for i in 0..12 {
        let now = i as f64 * 0.02;
        for sensor in ["LeftUpperArm", "RightUpperArm"] {
            let mut sample = Sample::new(now, 9);
            sample.set_accel(0.0, 0.0, 0.0);
            sample.set_relative_angles(std::f64::consts::PI, 0.0, 0.0);
            engine.append_sample(sensor, sample);
        }
        engine.update(now);
    }

    let entity = engine.entity(DEFAULT_ENTITY).unwrap();
    assert!(entity.arm_height().combined() > rest_arm);
    assert!(entity.arm_height().left() > 0.9);
    assert!(entity.contraction().volume() > 0.0);
}

#[test]
fn test_rendering_accessors_expose_state() {
    let mut engine = Engine::new(scenario_config(0.3));
    let values = [0.0, 0.1, 0.2, 0.3, 0.2, 0.1];
    drive_x_axis(&mut engine, "LeftHand", &values, 0.05);

    let entity = engine.entity(DEFAULT_ENTITY).unwrap();
    let sensor = entity.sensor("LeftHand").unwrap();
    assert_eq!(sensor.averaged().len(), values.len());
    assert_eq!(sensor.derivative().len(), values.len() - 1);

    let skeleton = entity.skeleton();
    assert!(skeleton.anchor_position("Head").is_some());
    assert!(skeleton.end_position("LeftHand").is_some());
}

#[test]
fn test_feature_frame_lists_all_sensors() {
    let mut engine = Engine::new(scenario_config(0.3));
    let values = [0.0, 0.2, 0.9, 0.95, 0.3, 0.05];
    drive_x_axis(&mut engine, "LeftHand", &values, 0.05);
    drive_x_axis_from(&mut engine, "RightHand", &[0.0; 6], 0.05, 0.3);

    let frame = engine.feature_frame();
    let sensors: Vec<&str> = frame
        .records
        .iter()
        .filter_map(|r| match r {
            FeatureRecord::Onset { sensor, .. } => Some(sensor.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(sensors, vec!["LeftHand", "RightHand"]);
}
