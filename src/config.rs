use crate::sampler::{self, SamplerConfig};
use crate::sensor::{DEFAULT_I2C_ADDRESS_7BIT, Millimeters};
use crate::stats::TrimPolicy;
use crate::tank::{DEFAULT_CAPACITY_LITERS, DEFAULT_MAX_HEIGHT_MM, PolynomialFit, TankGeometry};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_AVERAGE_MPG: f64 = 40.0;
pub const DEFAULT_EMPTY_DISTANCE_MM: f64 = 152.0;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub sampler: Option<SamplerSection>,
    #[serde(default)]
    pub tank: Option<TankSection>,
    #[serde(default)]
    pub display: Option<DisplaySection>,
    #[serde(default)]
    pub calibration: Option<CalibrationSettings>,
    #[serde(default)]
    pub sensor: Option<SensorSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SamplerSection {
    /// Raw reads per cycle (default: 20)
    pub sample_count: Option<usize>,
    /// Pause between raw reads in milliseconds (default: 10)
    pub sample_delay_ms: Option<u64>,
    /// Free-running cycle period in milliseconds (default: 1000)
    pub cycle_period_ms: Option<u64>,
    /// Drop the top and bottom 20% before averaging (default: true)
    pub trim_outliers: Option<bool>,
    /// Number of per-cycle means kept (default: 200)
    pub history_capacity: Option<usize>,
    pub min_distance_mm: Option<Millimeters>,
    pub max_distance_mm: Option<Millimeters>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TankSection {
    /// Distance the sensor reports when the tank is empty.
    pub empty_distance_mm: Option<f64>,
    pub max_height_mm: Option<f64>,
    pub capacity_liters: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplaySection {
    /// Seconds between renders (default: 30)
    pub refresh_secs: Option<u64>,
    /// Average fuel economy used for the range estimate (default: 40)
    pub average_mpg: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorSection {
    /// 7-bit I2C address (default: 0x29)
    pub i2c_address: Option<u8>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    pub fn calibration_path(&self) -> Option<&Path> {
        let path = self.calibration.as_ref()?.path.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Configured log level, or `None` if the string is not a tracing level.
    pub fn log_level(&self) -> Option<tracing::Level> {
        tracing::Level::from_str(self.logging.level.trim()).ok()
    }

    /// Sampler settings with defaults filled in. A zero sample count or an
    /// inverted distance window is rejected.
    pub fn sampler_config(&self) -> Result<SamplerConfig, ConfigError> {
        let section = self.sampler.clone().unwrap_or_default();
        let defaults = SamplerConfig::default();
        let config = SamplerConfig {
            sample_count: section.sample_count.unwrap_or(sampler::DEFAULT_SAMPLE_COUNT),
            sample_delay: section
                .sample_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.sample_delay),
            cycle_period: section
                .cycle_period_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cycle_period),
            trim: section
                .trim_outliers
                .map(TrimPolicy::from_enabled)
                .unwrap_or(defaults.trim),
            history_capacity: section
                .history_capacity
                .unwrap_or(defaults.history_capacity),
            min_distance_mm: section.min_distance_mm.unwrap_or(defaults.min_distance_mm),
            max_distance_mm: section.max_distance_mm.unwrap_or(defaults.max_distance_mm),
        };

        if config.sample_count == 0 {
            return Err(ConfigError::Invalid(
                "sampler.sample_count must be at least 1".to_string(),
            ));
        }
        if config.min_distance_mm > config.max_distance_mm {
            return Err(ConfigError::Invalid(format!(
                "sampler.min_distance_mm ({}) is above sampler.max_distance_mm ({})",
                config.min_distance_mm, config.max_distance_mm
            )));
        }
        Ok(config)
    }

    pub fn tank_geometry(&self, fit: PolynomialFit) -> TankGeometry {
        let section = self.tank.clone().unwrap_or_default();
        TankGeometry {
            max_height_mm: section.max_height_mm.unwrap_or(DEFAULT_MAX_HEIGHT_MM),
            capacity_liters: section.capacity_liters.unwrap_or(DEFAULT_CAPACITY_LITERS),
            fit,
        }
    }

    pub fn empty_distance_mm(&self) -> f64 {
        self.tank
            .as_ref()
            .and_then(|t| t.empty_distance_mm)
            .unwrap_or(DEFAULT_EMPTY_DISTANCE_MM)
    }

    /// Returns the render interval as Duration (default: 30 seconds)
    pub fn display_refresh(&self) -> Duration {
        let secs = self
            .display
            .as_ref()
            .and_then(|d| d.refresh_secs)
            .unwrap_or(DEFAULT_REFRESH_SECS);
        Duration::from_secs(secs)
    }

    pub fn average_mpg(&self) -> f64 {
        self.display
            .as_ref()
            .and_then(|d| d.average_mpg)
            .unwrap_or(DEFAULT_AVERAGE_MPG)
    }

    pub fn i2c_address(&self) -> u8 {
        self.sensor
            .as_ref()
            .and_then(|s| s.i2c_address)
            .unwrap_or(DEFAULT_I2C_ADDRESS_7BIT)
    }
}
