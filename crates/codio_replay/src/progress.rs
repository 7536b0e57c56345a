//! Once-per-second playback progress notifications.

use crate::scheduler::TimerSlot;
use codio_core::RelativeMs;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, interval_at};

type UpdateObserver = Arc<dyn Fn(u64, u64) + Send + Sync>;
type FinishObserver = Arc<dyn Fn() + Send + Sync>;

#[derive(Default, Clone)]
struct Observers {
    update: Vec<UpdateObserver>,
    finish: Vec<FinishObserver>,
}

/// Ticks once per second while playback runs.
///
/// Update observers receive `(current_second, total_seconds)`. Once the
/// current second passes the recording length, finish observers run, update
/// observers get a final `(total, total)` and the timer stops. Observers
/// run without any lock held, so they may register further observers.
pub struct ProgressTimer {
    length: Option<RelativeMs>,
    current: Arc<AtomicU64>,
    observers: Arc<Mutex<Observers>>,
    slot: TimerSlot,
}

impl ProgressTimer {
    /// Timer for a recording of `length`
    #[must_use]
    pub fn new(length: RelativeMs) -> Self {
        Self::with_length(Some(length))
    }

    /// Timer that never finishes on its own
    #[must_use]
    pub fn unbounded() -> Self {
        Self::with_length(None)
    }

    fn with_length(length: Option<RelativeMs>) -> Self {
        Self {
            length,
            current: Arc::new(AtomicU64::new(0)),
            observers: Arc::new(Mutex::new(Observers::default())),
            slot: TimerSlot::new(),
        }
    }

    /// Register an update observer
    pub fn on_update(&self, observer: impl Fn(u64, u64) + Send + Sync + 'static) {
        self.observers.lock().update.push(Arc::new(observer));
    }

    /// Register a finish observer
    pub fn on_finish(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.observers.lock().finish.push(Arc::new(observer));
    }

    /// Start ticking from `from_second`, replacing any running ticker
    pub fn run(&mut self, from_second: u64) {
        self.current.store(from_second, Ordering::SeqCst);
        let current = Arc::clone(&self.current);
        let observers = Arc::clone(&self.observers);
        let length = self.length;
        let period = Duration::from_secs(1);

        self.slot.schedule(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let second = current.fetch_add(1, Ordering::SeqCst) + 1;
                let total = length.map_or(0, |l| l.as_secs());
                let snapshot = observers.lock().clone();

                if length.is_some_and(|l| second.saturating_mul(1_000) > l.0) {
                    for observer in &snapshot.finish {
                        observer();
                    }
                    for observer in &snapshot.update {
                        observer(total, total);
                    }
                    break;
                }
                for observer in &snapshot.update {
                    observer(second, total);
                }
            }
        });
    }

    /// Stop ticking
    pub fn stop(&mut self) {
        self.slot.cancel();
    }

    /// Last second reported
    #[must_use]
    pub fn current_second(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Whether the ticker is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.slot.is_pending()
    }
}

impl std::fmt::Debug for ProgressTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTimer")
            .field("length", &self.length)
            .field("current", &self.current_second())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn recorder(timer: &ProgressTimer) -> Arc<Mutex<Vec<(u64, u64)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        timer.on_update(move |current, total| sink.lock().push((current, total)));
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_then_finishes() {
        let mut timer = ProgressTimer::new(RelativeMs(2_500));
        let seen = recorder(&timer);
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        timer.on_finish(move || flag.store(true, Ordering::SeqCst));

        timer.run(0);
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(*seen.lock(), vec![(1, 2), (2, 2), (2, 2)]);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_from_offset() {
        let mut timer = ProgressTimer::new(RelativeMs(10_000));
        let seen = recorder(&timer);
        timer.run(4);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(*seen.lock(), vec![(5, 10)]);
        assert_eq!(timer.current_second(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_observers() {
        let mut timer = ProgressTimer::new(RelativeMs(10_000));
        let seen = recorder(&timer);
        timer.run(0);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        timer.stop();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_keeps_running() {
        let mut timer = ProgressTimer::unbounded();
        timer.run(0);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(timer.current_second(), 10);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_may_register_observers() {
        let mut timer = ProgressTimer::new(RelativeMs(10_000));
        let seen = recorder(&timer);
        let observers = Arc::clone(&timer.observers);
        timer.on_update(move |_, _| {
            observers.lock().finish.push(Arc::new(|| {}));
        });

        timer.run(0);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(*seen.lock(), vec![(1, 10), (2, 10)]);
        assert_eq!(timer.observers.lock().finish.len(), 2);
        assert!(timer.is_running());
    }
}
