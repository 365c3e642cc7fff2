use crate::history::RingBuffer;
use crate::sensor::{DistanceSensor, ErrorKind, Millimeters, SensorHandle};
use crate::state::{NO_READING_MM, SensorSnapshot, SharedState};
use crate::stats::{self, SampleStats, TrimPolicy};
use crate::task::{Task, TaskPriority, remaining_period};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn};

pub const DEFAULT_SAMPLE_COUNT: usize = 20;
pub const DEFAULT_SAMPLE_DELAY: Duration = Duration::from_millis(10);
pub const DEFAULT_CYCLE_PERIOD: Duration = Duration::from_millis(1000);
pub const DEFAULT_MIN_DISTANCE_MM: Millimeters = 0;
/// Sized for a small tank; the window has to span the sensor's mounting depth.
pub const DEFAULT_MAX_DISTANCE_MM: Millimeters = 255;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub sample_count: usize,
    pub sample_delay: Duration,
    pub cycle_period: Duration,
    pub trim: TrimPolicy,
    pub history_capacity: usize,
    /// Readings outside this window are treated as range errors.
    pub min_distance_mm: Millimeters,
    pub max_distance_mm: Millimeters,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_delay: DEFAULT_SAMPLE_DELAY,
            cycle_period: DEFAULT_CYCLE_PERIOD,
            trim: TrimPolicy::default(),
            history_capacity: crate::history::DEFAULT_CAPACITY,
            min_distance_mm: DEFAULT_MIN_DISTANCE_MM,
            max_distance_mm: DEFAULT_MAX_DISTANCE_MM,
        }
    }
}

/// Raw readings of one cycle, split into usable distances and failures.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SampleSet {
    pub valid: Vec<Millimeters>,
    pub errors: Vec<ErrorKind>,
}

impl SampleSet {
    pub fn total(&self) -> usize {
        self.valid.len() + self.errors.len()
    }

    /// Most frequent failure; ties go to the one seen first.
    pub fn dominant_error(&self) -> Option<ErrorKind> {
        let mut counts: Vec<(ErrorKind, usize)> = Vec::new();
        for kind in &self.errors {
            match counts.iter_mut().find(|(seen, _)| seen == kind) {
                Some((_, count)) => *count += 1,
                None => counts.push((*kind, 1)),
            }
        }
        counts
            .iter()
            .fold(None, |best: Option<(ErrorKind, usize)>, &(kind, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((kind, count)),
            })
            .map(|(kind, _)| kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published { stats: SampleStats, rejected: usize },
    AllFailed { error: String },
}

/// Producer side of the gauge: samples, reduces, records history, publishes.
pub struct Sampler {
    sensor: SensorHandle,
    config: SamplerConfig,
    history: RingBuffer,
    state: Arc<SharedState>,
    generation: u64,
}

impl Sampler {
    pub fn new(sensor: SensorHandle, config: SamplerConfig, state: Arc<SharedState>) -> Self {
        let history = RingBuffer::new(config.history_capacity);
        Self {
            sensor,
            config,
            history,
            state,
            generation: 0,
        }
    }

    pub fn history(&self) -> &RingBuffer {
        &self.history
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        let start = Instant::now();

        let samples = match &mut self.sensor {
            SensorHandle::Ready(sensor) => collect_samples(sensor.as_mut(), &self.config),
            SensorHandle::Unavailable { reason } => {
                let message = format!("sensor unavailable: {reason}");
                return self.publish_failure(message, 0, start);
            }
        };

        if !samples.errors.is_empty() {
            warn!(
                rejected = samples.errors.len(),
                total = samples.total(),
                dominant = %samples.dominant_error().unwrap_or(ErrorKind::SystemError),
                "Excluded failed reads from sample set"
            );
        }

        let Some(stats) = stats::reduce(&samples.valid, self.config.trim) else {
            let kind = samples.dominant_error().unwrap_or(ErrorKind::SystemError);
            let message = format!(
                "{kind} ({}/{} reads failed)",
                samples.errors.len(),
                samples.total()
            );
            return self.publish_failure(message, samples.errors.len(), start);
        };

        self.history.push(stats.mean);
        let rejected = samples.errors.len();
        self.publish(stats.mean, stats.std_dev, None, stats.valid, rejected);

        info!(
            cursor = self.history.cursor(),
            avg_mm = format_args!("{:.1}", stats.mean),
            std_dev = format_args!("{:.2}", stats.std_dev),
            valid = stats.valid,
            retained = stats.retained,
            elapsed_ms = start.elapsed().as_millis(),
            "Sample cycle complete"
        );

        CycleOutcome::Published { stats, rejected }
    }

    fn publish_failure(&mut self, message: String, rejected: usize, start: Instant) -> CycleOutcome {
        error!(
            error = %message,
            elapsed_ms = start.elapsed().as_millis(),
            "Sample cycle produced no valid reading"
        );
        self.publish(NO_READING_MM, 0.0, Some(message.clone()), 0, rejected);
        CycleOutcome::AllFailed { error: message }
    }

    fn publish(
        &mut self,
        avg_mm: f64,
        std_dev: f64,
        error: Option<String>,
        valid_samples: usize,
        rejected_samples: usize,
    ) {
        self.generation += 1;
        let history = self.history.snapshot();
        let snapshot = SensorSnapshot {
            avg_mm,
            std_dev,
            history: history.values,
            cursor: history.cursor,
            history_len: history.written,
            updated_at: Some(SystemTime::now()),
            error,
            generation: self.generation,
            valid_samples,
            rejected_samples,
        };
        self.state.publish(snapshot);
    }
}

impl Task for Sampler {
    fn name(&self) -> &'static str {
        "sampler"
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority(3)
    }

    fn tick(&mut self) -> Duration {
        let start = Instant::now();
        self.run_cycle();
        remaining_period(self.config.cycle_period, start.elapsed())
    }
}

fn collect_samples(sensor: &mut dyn DistanceSensor, config: &SamplerConfig) -> SampleSet {
    let mut samples = SampleSet::default();
    for index in 0..config.sample_count {
        match sensor
            .read_distance()
            .and_then(|mm| validate_distance(mm, config))
        {
            Ok(mm) => samples.valid.push(mm),
            Err(kind) => {
                debug!(index, error = %kind, "Distance read rejected");
                samples.errors.push(kind);
            }
        }
        if index + 1 < config.sample_count && !config.sample_delay.is_zero() {
            std::thread::sleep(config.sample_delay);
        }
    }
    samples
}

fn validate_distance(distance_mm: Millimeters, config: &SamplerConfig) -> Result<Millimeters, ErrorKind> {
    if distance_mm < config.min_distance_mm {
        Err(ErrorKind::RangeUnderflow)
    } else if distance_mm > config.max_distance_mm {
        Err(ErrorKind::RangeOverflow)
    } else {
        Ok(distance_mm)
    }
}
