//! Lockout countdown
//!
//! Ticks once per second from the lockout deadline down to zero, fires the
//! end callback exactly once and stops. The tick task lives only as long as
//! its [`LockoutHandle`]: dropping or cancelling the handle stops it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use iris_common::events::{EventBus, IrisEvent};
use iris_common::time;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

pub struct LockoutTimer;

impl LockoutTimer {
    /// Start counting down to `deadline`
    ///
    /// A deadline already in the past ends the lockout on the first tick,
    /// which runs immediately.
    pub fn start<F>(deadline: DateTime<Utc>, events: EventBus, on_end: F) -> LockoutHandle
    where
        F: FnOnce() + Send + 'static,
    {
        // Wall-clock deadline converted once to the runtime clock
        let remaining = (deadline - time::now()).to_std().unwrap_or(Duration::ZERO);
        let end = Instant::now() + remaining;

        let (seconds_tx, seconds_rx) = watch::channel(remaining.as_secs());
        let (ended_tx, ended_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut on_end = Some(on_end);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Lockout timer cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let left = end.saturating_duration_since(Instant::now());
                        if left.is_zero() {
                            seconds_tx.send_replace(0);
                            if let Some(callback) = on_end.take() {
                                info!("Lockout ended");
                                callback();
                            }
                            ended_tx.send_replace(true);
                            events.emit(IrisEvent::LockoutEnded { timestamp: time::now() });
                            break;
                        }
                        let seconds_left = left.as_secs();
                        seconds_tx.send_replace(seconds_left);
                        events.emit(IrisEvent::LockoutTick { seconds_left });
                    }
                }
            }
        });

        LockoutHandle {
            deadline,
            seconds_left: seconds_rx,
            ended: ended_rx,
            cancel,
            task,
        }
    }
}

/// Owner of a running countdown
pub struct LockoutHandle {
    deadline: DateTime<Utc>,
    seconds_left: watch::Receiver<u64>,
    ended: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LockoutHandle {
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Whole seconds left as of the last tick
    pub fn seconds_left(&self) -> u64 {
        *self.seconds_left.borrow()
    }

    /// `MM:SS` for the lockout screen
    pub fn display(&self) -> String {
        time::format_countdown(self.seconds_left())
    }

    pub fn has_ended(&self) -> bool {
        *self.ended.borrow()
    }

    /// Watch the countdown
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.seconds_left.clone()
    }

    /// Resolve once the countdown reaches zero; `false` if it was cancelled first
    pub async fn wait(&self) -> bool {
        let mut ended = self.ended.clone();
        let reached_zero = ended.wait_for(|done| *done).await.is_ok();
        reached_zero
    }

    /// Stop ticking without firing the end callback
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LockoutHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let hook = fired.clone();
        (fired, move || {
            hook.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_ends_immediately() {
        let (fired, on_end) = counter();
        let handle = LockoutTimer::start(time::now() - chrono::Duration::seconds(3), EventBus::new(8), on_end);

        assert!(handle.wait().await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(handle.seconds_left(), 0);
        assert_eq!(handle.display(), "00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_without_firing() {
        let (fired, on_end) = counter();
        let handle = LockoutTimer::start(time::now() + chrono::Duration::seconds(30), EventBus::new(8), on_end);

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!handle.has_ended());
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reports_cancellation() {
        let (fired, on_end) = counter();
        let handle = LockoutTimer::start(time::now() + chrono::Duration::seconds(30), EventBus::new(8), on_end);

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();

        assert!(!handle.wait().await);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_task() {
        let (fired, on_end) = counter();
        let handle = LockoutTimer::start(time::now() + chrono::Duration::seconds(5), EventBus::new(8), on_end);
        drop(handle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
