use std::fmt;

pub mod mock;
pub mod vl53l1x;

pub type Millimeters = u16;

// VL53L1X default is 0x52 in 8-bit notation; use 0x29 for 7-bit addressing.
pub const DEFAULT_I2C_ADDRESS_7BIT: u8 = 0x29;
pub const I2C_7BIT_MIN: u8 = 0x08;
pub const I2C_7BIT_MAX: u8 = 0x77;

/// Per-reading failure reported by a time-of-flight sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SystemError,
    EceFailure,
    NoConvergence,
    RangeIgnored,
    SignalNoiseError,
    RawUnderflow,
    RawOverflow,
    RangeUnderflow,
    RangeOverflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::SystemError => "System error",
            Self::EceFailure => "ECE failure",
            Self::NoConvergence => "No convergence",
            Self::RangeIgnored => "Ignoring range",
            Self::SignalNoiseError => "Signal/Noise error",
            Self::RawUnderflow => "Raw reading underflow",
            Self::RawOverflow => "Raw reading overflow",
            Self::RangeUnderflow => "Range reading underflow",
            Self::RangeOverflow => "Range reading overflow",
        };
        f.write_str(message)
    }
}

pub trait DistanceSensor {
    /// Take one ranging measurement.
    fn read_distance(&mut self) -> Result<Millimeters, ErrorKind>;
}

/// The sensor as seen by the sampler: either a working device or the reason
/// it could not be brought up.
pub enum SensorHandle {
    Ready(Box<dyn DistanceSensor + Send>),
    Unavailable { reason: String },
}

impl SensorHandle {
    pub fn ready(sensor: impl DistanceSensor + Send + 'static) -> Self {
        Self::Ready(Box::new(sensor))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("SensorHandle::Ready"),
            Self::Unavailable { reason } => f
                .debug_struct("SensorHandle::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

pub fn validate_address(address: u8) -> Result<u8, crate::error::AppError> {
    if (I2C_7BIT_MIN..=I2C_7BIT_MAX).contains(&address) {
        Ok(address)
    } else {
        Err(crate::error::AppError::InvalidAddress(address))
    }
}
