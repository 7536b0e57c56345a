//! Single-slot task scheduler.
//!
//! At most one timed task is outstanding per slot. Scheduling replaces the
//! pending task and dropping the slot aborts it.

use std::future::Future;
use tokio::task::AbortHandle;

/// Holds at most one spawned task
#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<AbortHandle>,
}

impl TimerSlot {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Abort any pending task, then spawn `task` into the slot.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(task).abort_handle());
    }

    /// Abort the pending task; returns whether one was still running
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    /// Whether a task is scheduled and has not finished
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(counter: &Arc<AtomicUsize>, after: Duration) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            tokio::time::sleep(after).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new();
        slot.schedule(counting(&counter, Duration::from_millis(100)));
        assert!(slot.is_pending());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!slot.is_pending());
        assert!(!slot.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_replaces_pending() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new();
        slot.schedule(counting(&counter, Duration::from_millis(100)));
        slot.schedule(counting(&counter, Duration::from_millis(200)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new();
        slot.schedule(counting(&counter, Duration::from_millis(100)));
        assert!(slot.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut slot = TimerSlot::new();
            slot.schedule(counting(&counter, Duration::from_millis(100)));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
