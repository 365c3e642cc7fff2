//! Tank geometry: distance → fuel height → volume.
//!
//! The tank is not a prism, so volume is a calibrated degree-5 polynomial of
//! normalized height. The fit is empirical and can wander outside `[0, 1]`
//! near the ends; every stage clamps.

pub mod calibration;

pub use calibration::{CalibrationError, PolynomialFit, load_calibration_from_path};

pub const LITERS_PER_GALLON: f64 = 3.78541;
pub const DEFAULT_MAX_HEIGHT_MM: f64 = 261.9;
pub const DEFAULT_CAPACITY_LITERS: f64 = 17.5;

#[derive(Debug, Clone, PartialEq)]
pub struct TankGeometry {
    pub max_height_mm: f64,
    pub capacity_liters: f64,
    pub fit: PolynomialFit,
}

impl Default for TankGeometry {
    fn default() -> Self {
        Self {
            max_height_mm: DEFAULT_MAX_HEIGHT_MM,
            capacity_liters: DEFAULT_CAPACITY_LITERS,
            fit: PolynomialFit::default(),
        }
    }
}

/// Derived gauge values for one distance reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeReading {
    pub height_mm: f64,
    pub liters: f64,
    pub gallons: f64,
    pub percent_full: f64,
    pub range_miles: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankModel {
    geometry: TankGeometry,
    // p(0) and p(1) of the volume fit; used to pin empty to 0 and full to capacity.
    volume_at_empty: f64,
    volume_span: f64,
}

impl TankModel {
    pub fn new(geometry: TankGeometry) -> Result<Self, CalibrationError> {
        if !(geometry.max_height_mm.is_finite() && geometry.max_height_mm > 0.0) {
            return Err(CalibrationError::Invalid(format!(
                "max height must be positive, got {}",
                geometry.max_height_mm
            )));
        }
        if !(geometry.capacity_liters.is_finite() && geometry.capacity_liters > 0.0) {
            return Err(CalibrationError::Invalid(format!(
                "capacity must be positive, got {}",
                geometry.capacity_liters
            )));
        }
        let volume_at_empty = poly_eval(&geometry.fit.volume, 0.0);
        let volume_span = poly_eval(&geometry.fit.volume, 1.0) - volume_at_empty;
        if !(volume_span.is_finite() && volume_span > 0.0) {
            return Err(CalibrationError::Invalid(
                "volume fit must increase from empty to full".to_string(),
            ));
        }
        Ok(Self {
            geometry,
            volume_at_empty,
            volume_span,
        })
    }

    pub fn with_defaults() -> Self {
        let geometry = TankGeometry::default();
        let volume_at_empty = poly_eval(&geometry.fit.volume, 0.0);
        let volume_span = poly_eval(&geometry.fit.volume, 1.0) - volume_at_empty;
        Self {
            geometry,
            volume_at_empty,
            volume_span,
        }
    }

    pub fn max_height_mm(&self) -> f64 {
        self.geometry.max_height_mm
    }

    pub fn capacity_liters(&self) -> f64 {
        self.geometry.capacity_liters
    }

    pub fn volume_liters(&self, height_mm: f64) -> f64 {
        let capacity = self.geometry.capacity_liters;
        let h = clamp(height_mm / self.geometry.max_height_mm, 0.0, 1.0);
        let fraction = (poly_eval(&self.geometry.fit.volume, h) - self.volume_at_empty)
            / self.volume_span;
        clamp(fraction * capacity, 0.0, capacity)
    }

    pub fn volume_gallons(&self, height_mm: f64) -> f64 {
        self.volume_liters(height_mm) / LITERS_PER_GALLON
    }

    pub fn fill_percent(&self, height_mm: f64) -> f64 {
        clamp(
            100.0 * self.volume_liters(height_mm) / self.geometry.capacity_liters,
            0.0,
            100.0,
        )
    }

    /// Inverse fit, for checking a calibration against the physical tank.
    pub fn height_from_percent(&self, fill_pct: f64) -> f64 {
        let max = self.geometry.max_height_mm;
        let p = clamp(fill_pct / 100.0, 0.0, 1.0);
        clamp(poly_eval(&self.geometry.fit.height, p) * max, 0.0, max)
    }

    pub fn reading(&self, measured_mm: f64, empty_distance_mm: f64, average_mpg: f64) -> GaugeReading {
        let height_mm =
            height_from_distance(measured_mm, empty_distance_mm, self.geometry.max_height_mm);
        let liters = self.volume_liters(height_mm);
        let gallons = liters / LITERS_PER_GALLON;
        GaugeReading {
            height_mm,
            liters,
            gallons,
            percent_full: self.fill_percent(height_mm),
            range_miles: (gallons * average_mpg).max(0.0),
        }
    }
}

impl Default for TankModel {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Fuel height for a sensor mounted `empty_distance_mm` above the tank floor.
pub fn height_from_distance(measured_mm: f64, empty_distance_mm: f64, max_height_mm: f64) -> f64 {
    clamp(empty_distance_mm - measured_mm, 0.0, max_height_mm.max(0.0))
}

/// `c0·x⁵ + c1·x⁴ + c2·x³ + c3·x² + c4·x + c5`, highest power first.
pub fn poly_eval(coefficients: &[f64; 6], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, c| acc * x + c)
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}
