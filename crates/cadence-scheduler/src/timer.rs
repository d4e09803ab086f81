//! One-shot timer backends.
//!
//! The scheduler never sleeps itself. It asks a [`OneShotTimer`] to run a
//! callback once after a delay and keeps the returned handle so the timer can
//! be cancelled later.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::SchedulerError;

/// Callback run by a one-shot timer when it fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Arms and cancels single-fire timers.
pub trait OneShotTimer: Send + Sync + 'static {
    /// Handle for one armed timer.
    type Handle: Send + Sync + 'static;

    /// Run `callback` once after `delay`.
    fn arm(&self, delay: Duration, callback: TimerCallback) -> Self::Handle;

    /// Cancel a timer. Does nothing if it already fired or was cancelled.
    fn cancel(&self, handle: Self::Handle);
}

/// Timers backed by tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    /// Bind to the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime of the calling context.
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SchedulerError::NoRuntime)
    }
}

/// Handle for a timer armed on a [`TokioTimer`].
#[derive(Debug)]
pub struct TokioTimerHandle(AbortHandle);

impl TokioTimerHandle {
    /// Whether the timer task has fired or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl OneShotTimer for TokioTimer {
    type Handle = TokioTimerHandle;

    fn arm(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        TokioTimerHandle(task.abort_handle())
    }

    fn cancel(&self, handle: Self::Handle) {
        handle.0.abort();
    }
}

/// A virtual clock that fires timers only when advanced.
///
/// Callbacks run on the thread calling [`ManualTimer::advance`], one at a time,
/// in deadline order. Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<ManualTimerHandle, TimerCallback>,
}

/// Handle for a timer armed on a [`ManualTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManualTimerHandle {
    deadline: Duration,
    seq: u64,
}

impl ManualTimerHandle {
    /// Virtual time at which this timer fires.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time, measured from creation.
    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Number of armed timers that have not fired or been cancelled.
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Deadline of the earliest armed timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state().pending.keys().next().map(|h| h.deadline)
    }

    /// Move the clock forward by `by`, firing every timer that comes due.
    ///
    /// Timers armed by callbacks during the advance fire too if their
    /// deadline falls inside the window. Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let due = {
                let mut state = self.state();
                match state.pending.first_key_value() {
                    Some((handle, _)) if handle.deadline <= target => {
                        let handle = *handle;
                        state.now = handle.deadline;
                        state.pending.remove(&handle)
                    }
                    _ => None,
                }
            };

            match due {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        self.state().now = target;
        fired
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ManualTimer")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl OneShotTimer for ManualTimer {
    type Handle = ManualTimerHandle;

    fn arm(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
        let mut state = self.state();
        let handle = ManualTimerHandle {
            deadline: state.now + delay,
            seq: state.next_seq,
        };
        state.next_seq += 1;
        state.pending.insert(handle, callback);
        handle
    }

    fn cancel(&self, handle: Self::Handle) {
        self.state().pending.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> TimerCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move |name: &'static str| -> TimerCallback {
            let log = Arc::clone(&log_clone);
            Box::new(move || log.lock().unwrap().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_manual_timer_fires_in_deadline_order() {
        let timer = ManualTimer::new();
        let (log, cb) = recorder();

        timer.arm(ms(300), cb("c"));
        timer.arm(ms(100), cb("a"));
        timer.arm(ms(200), cb("b"));
        timer.arm(ms(200), cb("b2"));

        assert_eq!(timer.advance(ms(250)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "b2"]);
        assert_eq!(timer.now(), ms(250));
        assert_eq!(timer.next_deadline(), Some(ms(300)));

        assert_eq!(timer.advance(ms(50)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "b2", "c"]);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_manual_timer_cancel() {
        let timer = ManualTimer::new();
        let (log, cb) = recorder();

        let handle = timer.arm(ms(100), cb("cancelled"));
        timer.arm(ms(100), cb("kept"));
        timer.cancel(handle);
        // cancelling twice is harmless
        timer.cancel(handle);

        timer.advance(ms(100));
        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
    }

    #[test]
    fn test_manual_timer_runs_timers_armed_during_advance() {
        let timer = ManualTimer::new();
        let count = Arc::new(AtomicUsize::new(0));

        let inner_timer = timer.clone();
        let inner_count = Arc::clone(&count);
        timer.arm(
            ms(10),
            Box::new(move || {
                inner_count.fetch_add(1, Ordering::SeqCst);
                let c = Arc::clone(&inner_count);
                let handle = inner_timer.arm(
                    ms(10),
                    Box::new(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    }),
                );
                assert_eq!(handle.deadline(), ms(20));
            }),
        );

        assert_eq!(timer.advance(ms(25)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_delay() {
        let timer = TokioTimer::current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);

        let handle = timer.arm(
            ms(100),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(ms(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(ms(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_cancel() {
        let timer = TokioTimer::current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);

        let handle = timer.arm(
            ms(100),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        timer.cancel(handle);

        tokio::time::sleep(ms(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tokio_timer_requires_runtime() {
        assert_eq!(TokioTimer::current().unwrap_err(), SchedulerError::NoRuntime);
    }
}
