//! Per-question countdown with a cancellable handle.
//!
//! Expiry and cancellation race on a one-shot latch: whichever moves it out of
//! `ARMED` first wins, so `on_expire` never runs after a successful `cancel`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Identity of one `start` call. Events carry it so receivers can drop stale ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Handle to a running countdown. Dropping it cancels the countdown.
pub struct TimerHandle {
    id: TimerId,
    latch: Arc<AtomicU8>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// True while neither expiry nor cancellation has happened.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.latch.load(Ordering::Acquire) == ARMED
    }

    /// Stop the countdown. Returns `false` if expiry already won the latch.
    pub fn cancel(&self) -> bool {
        let won = self
            .latch
            .compare_exchange(ARMED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.task.abort();
        won
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

/// Schedules one countdown per active question on the tokio runtime.
#[derive(Debug)]
pub struct TimerController {
    tick: Duration,
    next_id: AtomicU64,
}

impl Default for TimerController {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick: Duration::from_secs(1),
            next_id: AtomicU64::new(0),
        }
    }

    /// Override the tick length. Clamped to at least one millisecond.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    /// Start a countdown of `duration_secs`.
    ///
    /// `on_tick` receives `duration_secs, duration_secs - 1, ..., 0`, the first one
    /// immediately and then one per tick. After the zero tick `on_expire` runs at most
    /// once, and never if the handle was cancelled first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start<T, E>(&self, duration_secs: u32, mut on_tick: T, on_expire: E) -> TimerHandle
    where
        T: FnMut(TimerId, u32) + Send + 'static,
        E: FnOnce(TimerId) + Send + 'static,
    {
        let id = TimerId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let latch = Arc::new(AtomicU8::new(ARMED));
        let task_latch = Arc::clone(&latch);
        let tick = self.tick;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for remaining in (0..=duration_secs).rev() {
                interval.tick().await;
                if task_latch.load(Ordering::Acquire) != ARMED {
                    return;
                }
                on_tick(id, remaining);
            }
            if task_latch
                .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                on_expire(id);
            }
        });

        TimerHandle { id, latch, task }
    }

    /// Equivalent to [`TimerHandle::cancel`].
    pub fn cancel(&self, handle: &TimerHandle) -> bool {
        handle.cancel()
    }
}
