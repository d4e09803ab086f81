//! Repeating schedules driven by a delay sequence.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::timer::{OneShotTimer, TokioTimer};
use crate::{DelaySequence, Handler, IntervalId, SchedulerError};

/// Registry of active repeating schedules.
///
/// Each schedule fires its handler repeatedly, waiting the delays yielded by
/// its [`DelaySequence`] between firings. The registry maps every live
/// [`IntervalId`] to the one timer currently armed for it, which is what
/// [`stop_repeating`](WaitingIntervals::stop_repeating) cancels.
///
/// Dropping the registry stops every schedule it owns.
pub struct WaitingIntervals<T: OneShotTimer = TokioTimer> {
    inner: Arc<Registry<T>>,
}

struct Registry<T: OneShotTimer> {
    timer: T,
    next_id: AtomicU64,
    pending: DashMap<IntervalId, T::Handle>,
}

impl WaitingIntervals<TokioTimer> {
    /// Create a registry whose timers run on the current tokio runtime.
    pub fn new() -> Result<Self, SchedulerError> {
        Ok(Self::with_timer(TokioTimer::current()?))
    }
}

impl<T: OneShotTimer> WaitingIntervals<T> {
    /// Create a registry on top of a specific timer backend.
    pub fn with_timer(timer: T) -> Self {
        Self {
            inner: Arc::new(Registry {
                timer,
                next_id: AtomicU64::new(1),
                pending: DashMap::new(),
            }),
        }
    }

    /// The timer backend.
    pub fn timer(&self) -> &T {
        &self.inner.timer
    }

    /// Start calling `handler` repeatedly.
    ///
    /// The first call happens after the first delay taken from `delays`; each
    /// later call waits for the next delay. `args` is cloned for every call and
    /// its elements are passed to `handler` as separate arguments.
    ///
    /// A handler that panics ends its schedule: the next timer is armed only
    /// after the handler returns. The identifier stays registered until
    /// stopped.
    ///
    /// Fails with [`SchedulerError::EmptySequence`] if `delays` has no
    /// elements.
    #[tracing::instrument(skip_all)]
    pub fn start_repeating<H, Args>(
        &self,
        handler: H,
        mut delays: DelaySequence,
        args: Args,
    ) -> Result<IntervalId, SchedulerError>
    where
        H: Handler<Args>,
        Args: Clone + Send + 'static,
    {
        let first_delay = delays.next_delay()?;
        let id = IntervalId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let firing = Firing {
            id,
            handler,
            args,
            delays,
            registry: Arc::downgrade(&self.inner),
        };

        // Arm while holding the entry so a short first delay cannot fire
        // before the handle is recorded.
        self.inner
            .pending
            .entry(id)
            .or_insert_with(|| firing.arm(&self.inner.timer, first_delay));

        info!(%id, first_delay_ms = first_delay.as_millis() as u64, "started repeating interval");
        Ok(id)
    }

    /// Stop a schedule and cancel its pending timer.
    ///
    /// Unknown or already stopped identifiers are ignored. Returns whether an
    /// active schedule was stopped.
    #[tracing::instrument(skip(self))]
    pub fn stop_repeating(&self, id: IntervalId) -> bool {
        match self.inner.pending.remove(&id) {
            Some((_, handle)) => {
                self.inner.timer.cancel(handle);
                info!(%id, "stopped repeating interval");
                true
            }
            None => {
                debug!(%id, "no active interval to stop");
                false
            }
        }
    }

    /// Stop every active schedule. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let ids = self.active_ids();
        let stopped = ids
            .into_iter()
            .filter_map(|id| self.inner.pending.remove(&id))
            .map(|(_, handle)| self.inner.timer.cancel(handle))
            .count();

        if stopped > 0 {
            info!(count = stopped, "stopped all repeating intervals");
        }
        stopped
    }

    /// Whether `id` refers to a schedule that has not been stopped.
    pub fn is_active(&self, id: IntervalId) -> bool {
        self.inner.pending.contains_key(&id)
    }

    /// Number of active schedules.
    pub fn active_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Identifiers of all active schedules, in issue order.
    pub fn active_ids(&self) -> Vec<IntervalId> {
        let mut ids: Vec<_> = self.inner.pending.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }
}

impl<T: OneShotTimer + Default> Default for WaitingIntervals<T> {
    fn default() -> Self {
        Self::with_timer(T::default())
    }
}

impl<T: OneShotTimer> Drop for WaitingIntervals<T> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl<T: OneShotTimer> fmt::Debug for WaitingIntervals<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitingIntervals")
            .field("active", &self.inner.pending.len())
            .field("next_id", &self.inner.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

/// State carried from one firing of a schedule to the next.
struct Firing<T: OneShotTimer, H, Args> {
    id: IntervalId,
    handler: H,
    args: Args,
    delays: DelaySequence,
    registry: Weak<Registry<T>>,
}

impl<T, H, Args> Firing<T, H, Args>
where
    T: OneShotTimer,
    H: Handler<Args>,
    Args: Clone + Send + 'static,
{
    fn arm(self, timer: &T, delay: Duration) -> T::Handle {
        timer.arm(delay, Box::new(move || self.fire()))
    }

    fn fire(mut self) {
        self.handler.call(self.args.clone());

        let Some(registry) = self.registry.upgrade() else {
            debug!(id = %self.id, "scheduler dropped, not rearming");
            return;
        };

        // Holding the entry orders this rearm against a concurrent stop.
        let Some(mut pending) = registry.pending.get_mut(&self.id) else {
            debug!(id = %self.id, "interval stopped during firing, not rearming");
            return;
        };

        match self.delays.next_delay() {
            Ok(delay) => {
                debug!(id = %self.id, delay_ms = delay.as_millis() as u64, "rearming interval");
                *pending = self.arm(&registry.timer, delay);
            }
            Err(e) => {
                error!(id = %self.id, error = %e, "no delay left, dropping interval");
                drop(pending);
                registry.pending.remove(&self.id);
            }
        }
    }
}
