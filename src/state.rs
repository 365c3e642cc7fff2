use crate::history::HistorySnapshot;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// `avg_mm` value meaning "no valid reading this cycle".
pub const NO_READING_MM: f64 = -1.0;

/// Point-in-time copy of everything the sampler publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub avg_mm: f64,
    pub std_dev: f64,
    pub history: Vec<f64>,
    pub cursor: usize,
    /// Leading history slots that hold real cycle means.
    pub history_len: usize,
    pub updated_at: Option<SystemTime>,
    pub error: Option<String>,
    /// Number of publishes that produced this value; zero before the first cycle.
    pub generation: u64,
    pub valid_samples: usize,
    pub rejected_samples: usize,
}

impl SensorSnapshot {
    /// State before the first sampling cycle completes.
    pub fn initial(history_capacity: usize) -> Self {
        Self {
            avg_mm: NO_READING_MM,
            std_dev: 0.0,
            history: vec![0.0; history_capacity.max(1)],
            cursor: 0,
            history_len: 0,
            updated_at: None,
            error: None,
            generation: 0,
            valid_samples: 0,
            rejected_samples: 0,
        }
    }

    pub fn has_reading(&self) -> bool {
        self.avg_mm >= 0.0
    }

    /// True when a consumer should show a diagnostic instead of a gauge.
    pub fn is_degraded(&self) -> bool {
        !self.has_reading() || self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn history_snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            values: self.history.clone(),
            cursor: self.cursor,
            written: self.history_len,
        }
    }
}

/// The one object shared between the sampler and the renderer.
///
/// Every field sits behind a single mutex that is created once here and
/// never recreated. `publish` and `snapshot` are the only ways in or out.
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<SensorSnapshot>,
}

impl SharedState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SensorSnapshot::initial(history_capacity)),
        }
    }

    /// Replace the published state in one critical section.
    ///
    /// The caller builds the snapshot before calling, so the lock only
    /// covers the move.
    pub fn publish(&self, snapshot: SensorSnapshot) {
        let mut guard = self.lock();
        *guard = snapshot;
    }

    /// Deep copy of the current state.
    pub fn snapshot(&self) -> SensorSnapshot {
        self.lock().clone()
    }

    // The guarded value is only ever replaced whole, so a panic in another
    // holder cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, SensorSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, UNIX_EPOCH};

    fn generation_snapshot(generation: u64, capacity: usize) -> SensorSnapshot {
        SensorSnapshot {
            avg_mm: generation as f64,
            std_dev: 0.5,
            history: vec![generation as f64; capacity],
            cursor: generation as usize % capacity,
            history_len: capacity,
            updated_at: Some(UNIX_EPOCH + Duration::from_secs(generation)),
            error: None,
            generation,
            valid_samples: 10,
            rejected_samples: 0,
        }
    }

    #[test]
    fn initial_snapshot_reports_no_reading() {
        let state = SharedState::new(8);

        let snapshot = state.snapshot();

        assert_eq!(snapshot.avg_mm, NO_READING_MM);
        assert_eq!(snapshot.history.len(), 8);
        assert_eq!(snapshot.generation, 0);
        assert!(snapshot.updated_at.is_none());
        assert!(snapshot.is_degraded());
    }

    #[test]
    fn publish_replaces_every_field() {
        let state = SharedState::new(4);
        let published = generation_snapshot(3, 4);

        state.publish(published.clone());

        assert_eq!(state.snapshot(), published);
        assert!(!state.snapshot().is_degraded());
    }

    #[test]
    fn snapshot_is_independent_of_later_publishes() {
        let state = SharedState::new(4);
        state.publish(generation_snapshot(1, 4));
        let held = state.snapshot();

        state.publish(generation_snapshot(2, 4));

        assert_eq!(held.generation, 1);
        assert!(held.history.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn error_text_marks_snapshot_degraded() {
        let mut snapshot = generation_snapshot(1, 4);
        snapshot.error = Some("Range reading overflow".to_string());
        assert!(snapshot.is_degraded());

        snapshot.error = Some(String::new());
        assert!(!snapshot.is_degraded());
    }

    #[test]
    fn concurrent_readers_never_observe_torn_snapshots() {
        const CAPACITY: usize = 200;
        let state = Arc::new(SharedState::new(CAPACITY));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let state = Arc::clone(&state);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for generation in 1..=2_000u64 {
                    state.publish(generation_snapshot(generation, CAPACITY));
                }
                done.store(true, Ordering::Release);
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let state = Arc::clone(&state);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut observed = 0u64;
                    while !done.load(Ordering::Acquire) {
                        let snapshot = state.snapshot();
                        let expected = snapshot.generation as f64;
                        // Generation 0 is the initial all-zero history.
                        assert!(snapshot.history.iter().all(|&v| v == expected));
                        if snapshot.generation > 0 {
                            assert_eq!(snapshot.avg_mm, expected);
                        }
                        observed = observed.max(snapshot.generation);
                    }
                    observed
                })
            })
            .collect();

        writer.join().expect("writer thread");
        for reader in readers {
            let observed = reader.join().expect("reader thread");
            assert!(observed <= 2_000);
        }
        assert_eq!(state.snapshot().generation, 2_000);
    }
}
