use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Latest-request-wins scheduler: a single pending slot, replaced (not
/// queued) on every trigger, run once a quiescence window passes without a
/// newer trigger.
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    /// Schedules `task` after the quiescence window, cancelling whatever was
    /// pending. Must be called from within a tokio runtime.
    pub fn trigger<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // The deadline is pinned here, not at the spawned task's first poll,
        // so the window is measured from the trigger itself.
        let deadline = Instant::now() + self.window;
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            task().await;
        });
        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rapid_triggers_collapse_into_the_latest() {
        let debouncer = Debouncer::new(Duration::from_millis(250));
        let executed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        for value in [1, 2, 3] {
            let sink = Arc::clone(&executed);
            debouncer.trigger(move || async move {
                sink.lock().push(value);
            });
            tokio::time::advance(Duration::from_millis(50)).await;
        }

        tokio::time::advance(Duration::from_millis(300)).await;
        // Yield so the surviving task gets to run to completion.
        tokio::task::yield_now().await;
        assert_eq!(executed.lock().as_slice(), &[3]);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_triggers_both_run() {
        let debouncer = Debouncer::new(Duration::from_millis(250));
        let executed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        for value in [1, 2] {
            let sink = Arc::clone(&executed);
            debouncer.trigger(move || async move {
                sink.lock().push(value);
            });
            tokio::time::advance(Duration::from_millis(400)).await;
            tokio::task::yield_now().await;
        }

        assert_eq!(executed.lock().as_slice(), &[1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_task() {
        let debouncer = Debouncer::new(Duration::from_millis(250));
        let executed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&executed);
        debouncer.trigger(move || async move {
            sink.lock().push(1);
        });
        debouncer.cancel();

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        assert!(executed.lock().is_empty());
    }
}
