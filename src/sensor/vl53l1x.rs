use crate::error::AppError;
use crate::sensor::{DistanceSensor, ErrorKind, Millimeters};

#[cfg(target_os = "linux")]
use crate::sensor::validate_address;
#[cfg(target_os = "linux")]
use rppal::i2c::I2c;
#[cfg(target_os = "linux")]
use tracing::warn;
#[cfg(target_os = "linux")]
use vl53l1x_uld::{IOVoltage, RangeStatus as Vl53l1xRangeStatus, VL53L1X};

#[cfg(target_os = "linux")]
pub struct Vl53l1xSensor {
    driver: VL53L1X<I2c>,
}

#[cfg(target_os = "linux")]
impl Vl53l1xSensor {
    /// Open the bus, initialise the device and start continuous ranging.
    pub fn open(address: u8) -> Result<Self, AppError> {
        let address = validate_address(address)?;
        let i2c = I2c::new().map_err(|err| AppError::I2c(err.to_string()))?;
        let mut driver = VL53L1X::new(i2c, address);
        driver
            .get_sensor_id()
            .map_err(|err| AppError::Sensor(format!("device not detected: {err:?}")))?;
        driver
            .init(IOVoltage::Volt2_8)
            .map_err(|err| AppError::Sensor(format!("init: {err:?}")))?;
        driver
            .start_ranging()
            .map_err(|err| AppError::Sensor(format!("start_ranging: {err:?}")))?;
        Ok(Self { driver })
    }
}

#[cfg(target_os = "linux")]
impl DistanceSensor for Vl53l1xSensor {
    fn read_distance(&mut self) -> Result<Millimeters, ErrorKind> {
        let result = self.driver.get_result().map_err(|err| {
            warn!(error = ?err, "VL53L1X result read failed");
            ErrorKind::SystemError
        })?;
        // Clear interrupt to trigger next measurement
        self.driver.clear_interrupt().map_err(|err| {
            warn!(error = ?err, "VL53L1X clear_interrupt failed");
            ErrorKind::SystemError
        })?;
        match range_status_error(result.status) {
            Some(kind) => Err(kind),
            None => Ok(result.distance_mm),
        }
    }
}

#[cfg(target_os = "linux")]
fn range_status_error(status: Vl53l1xRangeStatus) -> Option<ErrorKind> {
    match status {
        Vl53l1xRangeStatus::Valid => None,
        Vl53l1xRangeStatus::SigmaFailure | Vl53l1xRangeStatus::CrosstalkSignal => {
            Some(ErrorKind::SignalNoiseError)
        }
        Vl53l1xRangeStatus::SignalFailure => Some(ErrorKind::NoConvergence),
        Vl53l1xRangeStatus::MinRangeClipped | Vl53l1xRangeStatus::MinRangeFail => {
            Some(ErrorKind::RangeUnderflow)
        }
        Vl53l1xRangeStatus::OutOfBounds => Some(ErrorKind::RangeOverflow),
        Vl53l1xRangeStatus::LackOfSignal => Some(ErrorKind::RawUnderflow),
        Vl53l1xRangeStatus::InvalidRange => Some(ErrorKind::RawOverflow),
        Vl53l1xRangeStatus::WrapCheckFail
        | Vl53l1xRangeStatus::Wraparound
        | Vl53l1xRangeStatus::MergedPulse => Some(ErrorKind::RangeIgnored),
        Vl53l1xRangeStatus::ProcessingFailure => Some(ErrorKind::EceFailure),
        Vl53l1xRangeStatus::HardwareFailure
        | Vl53l1xRangeStatus::Synchronisation
        | Vl53l1xRangeStatus::None => Some(ErrorKind::SystemError),
    }
}

#[cfg(not(target_os = "linux"))]
pub struct Vl53l1xSensor;

#[cfg(not(target_os = "linux"))]
impl Vl53l1xSensor {
    pub fn open(_address: u8) -> Result<Self, AppError> {
        Err(AppError::Sensor(
            "VL53L1X driver requires Linux/Raspberry Pi".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl DistanceSensor for Vl53l1xSensor {
    fn read_distance(&mut self) -> Result<Millimeters, ErrorKind> {
        Err(ErrorKind::SystemError)
    }
}
