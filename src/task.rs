//! Periodic tasks and the two ways of driving them.
//!
//! A task is one pass of a loop plus the delay before the next pass. The
//! sampler blocks on sensor I/O, so it gets its own OS thread; the renderer
//! only copies and formats, so it runs on the tokio executor.

use crate::error::AppError;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskPriority(pub u8);

pub trait Task: Send {
    fn name(&self) -> &'static str;

    /// Informational on a hosted OS; logged at spawn.
    fn priority(&self) -> TaskPriority;

    /// Run one pass and return how long to wait before the next.
    fn tick(&mut self) -> Duration;
}

/// Drive `task` forever on a dedicated, named OS thread.
pub fn spawn_thread<T>(mut task: T) -> Result<std::thread::JoinHandle<()>, AppError>
where
    T: Task + 'static,
{
    let name = task.name();
    info!(task = name, priority = task.priority().0, "Spawning task thread");
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            loop {
                let delay = task.tick();
                std::thread::sleep(delay);
            }
        })
        .map_err(|source| AppError::Spawn { name, source })
}

/// Drive `task` forever on the current tokio runtime.
pub async fn run_async<T: Task>(mut task: T) {
    info!(task = task.name(), priority = task.priority().0, "Starting async task");
    loop {
        let delay = task.tick();
        tokio::time::sleep(delay).await;
    }
}

/// Time left in a free-running period once `elapsed` has been spent.
pub fn remaining_period(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        ticks: Arc<AtomicUsize>,
    }

    impl Task for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn priority(&self) -> TaskPriority {
            TaskPriority(1)
        }

        fn tick(&mut self) -> Duration {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Duration::from_millis(1)
        }
    }

    #[test]
    fn remaining_period_saturates_on_overrun() {
        let period = Duration::from_millis(1000);
        assert_eq!(
            remaining_period(period, Duration::from_millis(250)),
            Duration::from_millis(750)
        );
        assert_eq!(
            remaining_period(period, Duration::from_millis(1500)),
            Duration::ZERO
        );
    }

    #[test]
    fn spawned_thread_keeps_ticking() -> Result<(), AppError> {
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = spawn_thread(Counter {
            ticks: Arc::clone(&ticks),
        })?;

        while ticks.load(Ordering::SeqCst) < 3 {
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(handle.thread().name(), Some("counter"));
        assert!(!handle.is_finished());
        Ok(())
    }

    #[tokio::test]
    async fn async_task_keeps_ticking() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(run_async(Counter {
            ticks: Arc::clone(&ticks),
        }));

        while ticks.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        handle.abort();
        assert!(ticks.load(Ordering::SeqCst) >= 3);
    }
}
