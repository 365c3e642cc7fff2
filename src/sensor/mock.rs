use crate::sensor::{DistanceSensor, ErrorKind, Millimeters};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Scripted sensor for tests and host builds.
///
/// Readings are served in order; once the script runs out the fallback is
/// repeated forever. Reads are counted so tests can check how often the
/// sampler touched the device.
#[derive(Debug, Clone)]
pub struct MockSensor {
    script: VecDeque<Result<Millimeters, ErrorKind>>,
    fallback: Result<Millimeters, ErrorKind>,
    reads: Arc<Mutex<usize>>,
}

impl MockSensor {
    pub fn new(script: Vec<Result<Millimeters, ErrorKind>>) -> Self {
        Self {
            script: script.into(),
            fallback: Err(ErrorKind::SystemError),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    /// Always returns the same distance.
    pub fn constant(distance_mm: Millimeters) -> Self {
        Self::new(Vec::new()).with_fallback(Ok(distance_mm))
    }

    /// Always fails with the same error.
    pub fn failing(kind: ErrorKind) -> Self {
        Self::new(Vec::new()).with_fallback(Err(kind))
    }

    pub fn from_distances(distances: &[Millimeters]) -> Self {
        Self::new(distances.iter().copied().map(Ok).collect())
    }

    pub fn with_fallback(mut self, fallback: Result<Millimeters, ErrorKind>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Append more readings to the end of the script.
    pub fn extend(&mut self, readings: impl IntoIterator<Item = Result<Millimeters, ErrorKind>>) {
        self.script.extend(readings);
    }

    /// Shared read counter; stays valid after the sensor is moved into a sampler.
    pub fn read_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.reads)
    }
}

impl DistanceSensor for MockSensor {
    fn read_distance(&mut self) -> Result<Millimeters, ErrorKind> {
        *self.reads.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}
