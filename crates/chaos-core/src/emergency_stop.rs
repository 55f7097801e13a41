use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Process-wide latch. Once triggered, new experiments refuse to start;
/// running experiments observe it at their next await point and unwind.
/// Reset is an explicit operator action -- it is never automatic.
#[derive(Default)]
pub struct EmergencyStop {
    triggered: AtomicBool,
    notify: Notify,
}

impl EmergencyStop {
    pub fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Idempotent: triggering an already-triggered stop is a no-op beyond
    /// waking any waiters again.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::warn!("emergency stop triggered");
        }
        self.notify.notify_waiters();
    }

    pub fn reset(&self) {
        self.triggered.store(false, Ordering::SeqCst);
        tracing::info!("emergency stop reset");
    }

    pub fn is_set(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve immediately if already triggered, otherwise suspend until
    /// the next `trigger()`. The `notified()` future is created before the
    /// `is_set()` check so a `trigger()` landing in between is not missed --
    /// `Notify::notify_waiters` wakes only futures already registered, so
    /// checking first and registering second would lose that wakeup.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_set() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_returns_immediately_once_triggered() {
        let stop = Arc::new(EmergencyStop::new());
        stop.trigger();
        tokio::time::timeout(std::time::Duration::from_millis(50), stop.wait())
            .await
            .expect("wait() should resolve immediately");
    }

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let stop = EmergencyStop::new();
        stop.trigger();
        stop.trigger();
        assert!(stop.is_set());
    }

    #[tokio::test]
    async fn wait_wakes_late_arrivals() {
        let stop = Arc::new(EmergencyStop::new());
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move {
                stop.wait().await;
            })
        };
        tokio::task::yield_now().await;
        stop.trigger();
        tokio::time::timeout(std::time::Duration::from_millis(100), waiter)
            .await
            .expect("waiter task should complete")
            .unwrap();
    }
}
