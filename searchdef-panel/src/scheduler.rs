//! Trailing-edge debounce for panel commits.
//!
//! `SpacedUpdate` owns exactly one timer slot. Every `schedule_update`
//! aborts whatever timer is armed and arms a fresh one; the commit callback
//! runs once the slot has been left alone for the full interval. The slot
//! is emptied before the callback starts, so an update scheduled while a
//! commit is running arms a new timer instead of cancelling the commit.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Quiescence interval used when nothing else is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

type CommitCallback = dyn Fn() -> BoxFuture<'static, ()> + Send + Sync;

struct ArmedTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerSlot {
    armed: Option<ArmedTimer>,
    next_ticket: u64,
}

pub struct SpacedUpdate {
    interval: Duration,
    callback: Arc<CommitCallback>,
    slot: Arc<Mutex<TimerSlot>>,
}

impl SpacedUpdate {
    pub fn new<F, Fut>(interval: Duration, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            interval,
            callback: Arc::new(move || callback().boxed()),
            slot: Arc::new(Mutex::new(TimerSlot::default())),
        }
    }

    /// Arm (or re-arm) the timer. Must be called from within a tokio runtime.
    pub fn schedule_update(&self) {
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.armed.take() {
            previous.handle.abort();
        }
        slot.next_ticket += 1;
        let ticket = slot.next_ticket;

        let slot_ref = Arc::clone(&self.slot);
        let callback = Arc::clone(&self.callback);
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            {
                let mut slot = lock(&slot_ref);
                match &slot.armed {
                    Some(armed) if armed.ticket == ticket => slot.armed = None,
                    _ => return,
                }
            }
            tracing::trace!(ticket, "spaced update fired");
            callback().await;
        });
        slot.armed = Some(ArmedTimer { ticket, handle });
    }

    /// Drop the armed timer, if any. Returns whether one was pending.
    ///
    /// A commit that already started is not affected.
    pub fn cancel(&self) -> bool {
        match lock(&self.slot).armed.take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel the armed timer and run the callback right away.
    pub async fn flush_now(&self) {
        self.cancel();
        (self.callback)().await;
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).armed.is_some()
    }
}

impl Drop for SpacedUpdate {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(slot: &Mutex<TimerSlot>) -> MutexGuard<'_, TimerSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn counting(interval: Duration) -> (SpacedUpdate, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let update = SpacedUpdate::new(interval, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (update, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_after_quiescence() {
        let (update, fired) = counting(DEFAULT_INTERVAL);

        for _ in 0..5 {
            update.schedule_update();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(update.is_pending());

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!update.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_before_interval() {
        let (update, fired) = counting(Duration::from_millis(100));
        update.schedule_update();
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_timer() {
        let (update, fired) = counting(Duration::from_millis(100));
        update.schedule_update();
        assert!(update.cancel());
        assert!(!update.cancel());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_runs_immediately_and_cancels_timer() {
        let (update, fired) = counting(Duration::from_millis(100));
        update.schedule_update();
        update.flush_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_during_running_callback_rearms() {
        let release = Arc::new(Notify::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let update = {
            let release = Arc::clone(&release);
            let fired = Arc::clone(&fired);
            SpacedUpdate::new(Duration::from_millis(100), move || {
                let release = Arc::clone(&release);
                let fired = Arc::clone(&fired);
                async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                }
            })
        };

        update.schedule_update();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!update.is_pending());

        update.schedule_update();
        assert!(update.is_pending());
        release.notify_one();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        release.notify_one();
    }
}
