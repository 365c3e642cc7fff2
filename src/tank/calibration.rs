//! Offline tank calibration, loaded from `calibration.json`.
//!
//! ```json
//! { "model": "poly5", "params": { "volume": [6 numbers], "height": [6 numbers] } }
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const POLY5_MODEL: &str = "poly5";

/// Height → volume-fraction and fill-fraction → height fits, highest power first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolynomialFit {
    pub volume: [f64; 6],
    pub height: [f64; 6],
}

impl Default for PolynomialFit {
    fn default() -> Self {
        Self {
            volume: [-0.487443, -1.674212, 1.908638, 1.333798, -0.100086, 0.001364],
            height: [13.174324, -33.189784, 30.914695, -13.198428, 3.186544, 0.063000],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalibrationFile {
    pub model: String,
    pub params: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("failed to read calibration file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse calibration file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid calibration: {0}")]
    Invalid(String),
}

pub fn create_fit(file: &CalibrationFile) -> Result<PolynomialFit, CalibrationError> {
    match file.model.as_str() {
        POLY5_MODEL => {
            let fit: PolynomialFit = serde_json::from_value(file.params.clone())?;
            let finite = fit.volume.iter().chain(fit.height.iter()).all(|c| c.is_finite());
            if !finite {
                return Err(CalibrationError::Invalid(
                    "coefficients must be finite".to_string(),
                ));
            }
            Ok(fit)
        }
        other => Err(CalibrationError::Invalid(format!("unknown model: {other}"))),
    }
}

pub fn parse_calibration(contents: &str) -> Result<PolynomialFit, CalibrationError> {
    let file: CalibrationFile = serde_json::from_str(contents)?;
    create_fit(&file)
}

pub fn load_calibration_from_path(path: impl AsRef<Path>) -> Result<PolynomialFit, CalibrationError> {
    let contents = std::fs::read_to_string(path)?;
    parse_calibration(&contents)
}
