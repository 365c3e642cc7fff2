//! Consumer side of the gauge.
//!
//! The renderer copies a snapshot, turns it into display values through the
//! tank model and hands the result to a [`GaugeSink`]. Drawing pixels is the
//! sink's business; the shipped [`LogSink`] just writes structured logs.

use crate::state::{SensorSnapshot, SharedState};
use crate::tank::{GaugeReading, TankModel};
use crate::task::{Task, TaskPriority};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

pub const NO_DATA_MESSAGE: &str = "Not getting sensor data";
pub const LOW_FUEL_LABEL: &str = "GET GAS!";
const LOW_FUEL_GALLONS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeView {
    pub reading: GaugeReading,
    pub fuel_label: String,
    pub range_label: String,
    pub status_line: String,
    /// Per-cycle mean distances, oldest first. Only cycles that published a
    /// reading are listed.
    pub history: Vec<f64>,
    pub cursor: usize,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Gauge(GaugeView),
    Diagnostic(String),
}

pub trait GaugeSink {
    fn draw_gauge(&mut self, view: &GaugeView);
    fn draw_diagnostic(&mut self, message: &str);
}

/// Headless sink that reports every frame through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl GaugeSink for LogSink {
    fn draw_gauge(&mut self, view: &GaugeView) {
        info!(
            fuel = %view.fuel_label,
            range = %view.range_label,
            percent_full = format_args!("{:.0}", view.reading.percent_full),
            height_mm = format_args!("{:.1}", view.reading.height_mm),
            history_len = view.history.len(),
            updated_at = view.updated_at.as_deref().unwrap_or("never"),
            "{}",
            view.status_line
        );
    }

    fn draw_diagnostic(&mut self, message: &str) {
        warn!(diagnostic = message, "Gauge diagnostic");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub empty_distance_mm: f64,
    pub average_mpg: f64,
    pub refresh: Duration,
}

pub struct Renderer<S> {
    state: Arc<SharedState>,
    model: TankModel,
    config: RendererConfig,
    sink: S,
    started: Instant,
}

impl<S: GaugeSink> Renderer<S> {
    pub fn new(state: Arc<SharedState>, model: TankModel, config: RendererConfig, sink: S) -> Self {
        Self {
            state,
            model,
            config,
            sink,
            started: Instant::now(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Fetch, compute and draw one frame.
    pub fn render_once(&mut self) -> RenderOutcome {
        let snapshot = self.state.snapshot();
        let outcome = self.compute(&snapshot);
        match &outcome {
            RenderOutcome::Gauge(view) => self.sink.draw_gauge(view),
            RenderOutcome::Diagnostic(message) => self.sink.draw_diagnostic(message),
        }
        outcome
    }

    fn compute(&self, snapshot: &SensorSnapshot) -> RenderOutcome {
        if snapshot.is_degraded() {
            let message = snapshot
                .error
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or(NO_DATA_MESSAGE);
            return RenderOutcome::Diagnostic(message.to_string());
        }

        let reading = self.model.reading(
            snapshot.avg_mm,
            self.config.empty_distance_mm,
            self.config.average_mpg,
        );
        let uptime = format_uptime(self.started.elapsed());
        RenderOutcome::Gauge(GaugeView {
            reading,
            fuel_label: fuel_label(reading.gallons),
            range_label: format!("{}mi", reading.range_miles.trunc() as u64),
            status_line: format!(
                "Lidar: {:.0}mm (d={:.1}) Up {uptime}",
                snapshot.avg_mm, snapshot.std_dev
            ),
            history: snapshot.history_snapshot().chronological(),
            cursor: snapshot.cursor,
            updated_at: snapshot.updated_at.and_then(format_timestamp),
        })
    }
}

impl<S: GaugeSink + Send> Task for Renderer<S> {
    fn name(&self) -> &'static str {
        "renderer"
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority(3)
    }

    fn tick(&mut self) -> Duration {
        self.render_once();
        self.config.refresh
    }
}

pub fn fuel_label(gallons: f64) -> String {
    if gallons < LOW_FUEL_GALLONS {
        LOW_FUEL_LABEL.to_string()
    } else {
        format!("{gallons:.1} gal")
    }
}

pub fn format_uptime(uptime: Duration) -> String {
    let mut seconds = uptime.as_secs();
    let days = seconds / 86_400;
    seconds %= 86_400;
    let hours = seconds / 3_600;
    seconds %= 3_600;
    let minutes = seconds / 60;
    seconds %= 60;

    if days >= 1 {
        format!("{days}d {hours}h")
    } else if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

fn format_timestamp(at: SystemTime) -> Option<String> {
    OffsetDateTime::from(at).format(&Rfc3339).ok()
}
