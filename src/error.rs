use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid I2C address: {0:#04x}")]
    InvalidAddress(u8),
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("failed to spawn task {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
