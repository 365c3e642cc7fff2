use fuel_gauge::render::{GaugeSink, GaugeView, RenderOutcome, Renderer, RendererConfig};
use fuel_gauge::sampler::{CycleOutcome, Sampler, SamplerConfig};
use fuel_gauge::sensor::mock::MockSensor;
use fuel_gauge::sensor::{ErrorKind, SensorHandle};
use fuel_gauge::state::{NO_READING_MM, SharedState};
use fuel_gauge::stats::TrimPolicy;
use fuel_gauge::tank::TankModel;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn fast_config(sample_count: usize, trim: TrimPolicy) -> SamplerConfig {
    SamplerConfig {
        sample_count,
        sample_delay: Duration::ZERO,
        cycle_period: Duration::ZERO,
        trim,
        ..SamplerConfig::default()
    }
}

#[derive(Default)]
struct CountingSink {
    gauges: usize,
    diagnostics: Vec<String>,
}

impl GaugeSink for CountingSink {
    fn draw_gauge(&mut self, _view: &GaugeView) {
        self.gauges += 1;
    }

    fn draw_diagnostic(&mut self, message: &str) {
        self.diagnostics.push(message.to_string());
    }
}

#[test]
fn pipeline_publishes_reference_statistics() {
    let sensor = MockSensor::from_distances(&[10, 12, 11, 13, 9, 10, 11, 12, 10, 11]);
    let state = Arc::new(SharedState::new(200));
    let mut sampler = Sampler::new(
        SensorHandle::ready(sensor),
        fast_config(10, TrimPolicy::Untrimmed),
        Arc::clone(&state),
    );

    sampler.run_cycle();

    let snapshot = state.snapshot();
    assert!((snapshot.avg_mm - 10.9).abs() < 1e-9);
    assert!((snapshot.std_dev - 1.136).abs() < 1e-3);
    assert_eq!(snapshot.history[0], snapshot.avg_mm);
    assert_eq!(snapshot.cursor, 1);
    assert!(snapshot.updated_at.is_some());
    assert_eq!(snapshot.error, None);
}

#[test]
fn error_latches_until_next_good_cycle() {
    let sample_count = 4;
    let mut sensor = MockSensor::new(Vec::new());
    sensor.extend(std::iter::repeat_n(Err(ErrorKind::NoConvergence), 5 * sample_count));
    sensor.extend(std::iter::repeat_n(Ok(60), sample_count));
    let state = Arc::new(SharedState::new(200));
    let mut sampler = Sampler::new(
        SensorHandle::ready(sensor),
        fast_config(sample_count, TrimPolicy::Trimmed),
        Arc::clone(&state),
    );

    for _ in 0..5 {
        let outcome = sampler.run_cycle();
        assert!(matches!(outcome, CycleOutcome::AllFailed { .. }));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.avg_mm, NO_READING_MM);
        assert!(snapshot.error.as_deref().is_some_and(|e| e.contains("No convergence")));
        assert_eq!(snapshot.cursor, 0);
    }
    assert!(sampler.history().is_empty());

    let outcome = sampler.run_cycle();

    assert!(matches!(outcome, CycleOutcome::Published { .. }));
    let snapshot = state.snapshot();
    assert_eq!(snapshot.avg_mm, 60.0);
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.cursor, 1);
    assert_eq!(snapshot.generation, 6);
}

#[test]
fn history_wraps_after_capacity_cycles() {
    let mut sensor = MockSensor::new(Vec::new());
    sensor.extend((1..=201).map(Ok));
    let state = Arc::new(SharedState::new(200));
    let mut sampler = Sampler::new(
        SensorHandle::ready(sensor),
        fast_config(1, TrimPolicy::Trimmed),
        Arc::clone(&state),
    );

    for _ in 0..200 {
        sampler.run_cycle();
    }
    let wrapped = state.snapshot();
    assert_eq!(wrapped.cursor, 0);
    assert_eq!(wrapped.history[0], 1.0);
    assert_eq!(wrapped.history[199], 200.0);

    sampler.run_cycle();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.cursor, 1);
    assert_eq!(snapshot.history[0], 201.0);
    assert_eq!(snapshot.history[1], 2.0);
}

#[test]
fn renderer_follows_sampler_state() {
    let mut sensor = MockSensor::new(vec![Err(ErrorKind::RawOverflow); 3]);
    sensor.extend(vec![Ok(81); 3]);
    let state = Arc::new(SharedState::new(200));
    let mut sampler = Sampler::new(
        SensorHandle::ready(sensor),
        fast_config(3, TrimPolicy::Trimmed),
        Arc::clone(&state),
    );
    let config = RendererConfig {
        empty_distance_mm: 152.0,
        average_mpg: 40.0,
        refresh: Duration::from_secs(30),
    };
    let mut renderer = Renderer::new(
        Arc::clone(&state),
        TankModel::with_defaults(),
        config,
        CountingSink::default(),
    );

    sampler.run_cycle();
    let failed = renderer.render_once();
    sampler.run_cycle();
    let recovered = renderer.render_once();

    assert_eq!(
        failed,
        RenderOutcome::Diagnostic("Raw reading overflow (3/3 reads failed)".to_string())
    );
    let RenderOutcome::Gauge(view) = recovered else {
        panic!("expected a gauge after recovery");
    };
    assert_eq!(view.reading.height_mm, 71.0);
    assert_eq!(view.history, vec![81.0]);
    assert!(view.reading.percent_full > 0.0 && view.reading.percent_full < 100.0);
    assert_eq!(renderer.sink().gauges, 1);
    assert_eq!(renderer.sink().diagnostics.len(), 1);
}

#[test]
fn concurrent_sampler_and_reader_see_whole_cycles() {
    let capacity = 16;
    let state = Arc::new(SharedState::new(capacity));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let state = Arc::clone(&state);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            // Every cycle reads one distance equal to its cycle number.
            let mut sensor = MockSensor::new(Vec::new());
            sensor.extend((1..=500).map(Ok));
            let config = SamplerConfig {
                history_capacity: capacity,
                max_distance_mm: 1_000,
                ..fast_config(1, TrimPolicy::Untrimmed)
            };
            let mut sampler = Sampler::new(SensorHandle::ready(sensor), config, state);
            for _ in 0..500 {
                sampler.run_cycle();
            }
            done.store(true, Ordering::Release);
        })
    };

    while !done.load(Ordering::Acquire) {
        let snapshot = state.snapshot();
        if snapshot.generation == 0 {
            continue;
        }
        let newest = (snapshot.cursor + capacity - 1) % capacity;
        assert_eq!(snapshot.history[newest], snapshot.avg_mm);
        assert_eq!(snapshot.avg_mm, snapshot.generation as f64);
    }

    writer.join().expect("sampler thread");
    assert_eq!(state.snapshot().generation, 500);
}
