use fuel_gauge::config::{self, Config};
use fuel_gauge::render::{LogSink, Renderer, RendererConfig};
use fuel_gauge::sampler::Sampler;
use fuel_gauge::sensor::SensorHandle;
use fuel_gauge::sensor::vl53l1x::Vl53l1xSensor;
use fuel_gauge::state::SharedState;
use fuel_gauge::tank::{self, PolynomialFit, TankModel};
use fuel_gauge::task;
use std::sync::Arc;
use tracing::Level;

fn init_tracing(level: Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let config = match config::load_from_path(&config_path) {
        Ok(config) => config,
        Err(err) => {
            init_tracing(Level::INFO);
            tracing::error!(config_path = %config_path, error = %err, "Failed to load config");
            return Err(err.into());
        }
    };

    init_tracing(config.log_level().unwrap_or(Level::INFO));
    if config.log_level().is_none() {
        tracing::warn!(level = %config.logging.level, "Unknown log level, using info");
    }
    tracing::info!(config_path = %config_path, app = %config.app.name, "fuel-gauge starting");

    let model = load_tank_model(&config);
    let sampler_config = match config.sampler_config() {
        Ok(sampler_config) => sampler_config,
        Err(err) => {
            tracing::error!(config_path = %config_path, error = %err, "Invalid sampler settings");
            return Err(err.into());
        }
    };
    let renderer_config = RendererConfig {
        empty_distance_mm: config.empty_distance_mm(),
        average_mpg: config.average_mpg(),
        refresh: config.display_refresh(),
    };
    tracing::info!(
        capacity_liters = model.capacity_liters(),
        max_height_mm = model.max_height_mm(),
        empty_distance_mm = renderer_config.empty_distance_mm,
        average_mpg = renderer_config.average_mpg,
        refresh_secs = renderer_config.refresh.as_secs(),
        sample_count = sampler_config.sample_count,
        trim = ?sampler_config.trim,
        "Gauge configured"
    );

    let state = Arc::new(SharedState::new(sampler_config.history_capacity));

    let sensor = open_sensor(&config);
    let sampler = Sampler::new(sensor, sampler_config, Arc::clone(&state));
    let _sampler_handle = task::spawn_thread(sampler)?;

    let renderer = Renderer::new(state, model, renderer_config, LogSink);
    tokio::spawn(task::run_async(renderer)).await?;

    Ok(())
}

/// Build the tank model from config, falling back to the built-in fit.
fn load_tank_model(config: &Config) -> TankModel {
    let fit = match config.calibration_path() {
        Some(path) => match tank::load_calibration_from_path(path) {
            Ok(fit) => {
                tracing::info!(path = %path.display(), "Tank calibration loaded");
                fit
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load calibration, using default");
                PolynomialFit::default()
            }
        },
        None => {
            tracing::info!("No calibration path configured, using default fit");
            PolynomialFit::default()
        }
    };

    match TankModel::new(config.tank_geometry(fit)) {
        Ok(model) => model,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid tank geometry, using default tank");
            TankModel::with_defaults()
        }
    }
}

/// Bring up the distance sensor; a missing device puts the gauge in degraded mode.
fn open_sensor(config: &Config) -> SensorHandle {
    let address = config.i2c_address();
    match Vl53l1xSensor::open(address) {
        Ok(sensor) => {
            tracing::info!(address = format_args!("{address:#04x}"), "Distance sensor ready");
            SensorHandle::ready(sensor)
        }
        Err(err) => {
            tracing::error!(
                address = format_args!("{address:#04x}"),
                error = %err,
                "Distance sensor unavailable, running degraded"
            );
            SensorHandle::unavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let _config = config::load_default()?;
        Ok(())
    }

    #[test]
    fn default_config_builds_configured_tank() -> Result<(), Box<dyn std::error::Error>> {
        let config = config::load_default()?;

        let model = load_tank_model(&config);

        assert_eq!(model.max_height_mm(), 142.0);
        assert_eq!(model.capacity_liters(), 17.03);
        Ok(())
    }
}
