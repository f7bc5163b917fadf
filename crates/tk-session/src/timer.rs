//! Single-shot timers used to drive auto-logout.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tk_core::{Clock, ManualClock, Result, TkError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque id of a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

/// Schedule/cancel facility.
///
/// `schedule` must never run the callback before returning, even for a zero
/// delay. Cancelling an unknown or already-fired handle is a no-op.
pub trait TimerFacility: Send + Sync {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

/// Timer backed by tokio tasks: one sleeping task per scheduled callback.
pub struct TokioTimer {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Timer on the runtime of the calling context.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| TkError::Runtime(e.to_string()))
    }

    /// Number of callbacks scheduled and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl TimerFacility for TokioTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);
        // Held across spawn so the task cannot deregister before it is registered.
        let mut guard = self.tasks.lock();
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tasks.lock().remove(&id);
            callback();
        });
        guard.insert(id, join);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(join) = self.tasks.lock().remove(&handle.0) {
            join.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, join) in self.tasks.lock().drain() {
            join.abort();
        }
    }
}

struct Scheduled {
    id: u64,
    deadline_ms: i64,
    callback: TimerCallback,
}

/// Deterministic timer driven by a [`ManualClock`].
///
/// Nothing fires until [`ManualTimer::advance`] or [`ManualTimer::run_due`]
/// is called. Due callbacks fire in deadline order, ties in scheduling order.
pub struct ManualTimer {
    clock: Arc<ManualClock>,
    next_id: AtomicU64,
    queue: Mutex<Vec<Scheduled>>,
}

impl ManualTimer {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            next_id: AtomicU64::new(1),
            queue: Mutex::new(Vec::new()),
        }
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Fire everything due at the current instant. Returns the number fired.
    pub fn run_due(&self) -> usize {
        self.fire_until(self.clock.now_ms())
    }

    /// Move the clock forward by `by`, firing each due callback with the
    /// clock set to its deadline. Returns the number fired.
    pub fn advance(&self, by: Duration) -> usize {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        let target = self.clock.now_ms().saturating_add(delta);
        let fired = self.fire_until(target);
        self.clock.set(target);
        fired
    }

    fn fire_until(&self, target_ms: i64) -> usize {
        let mut fired = 0;
        while let Some(next) = self.pop_due(target_ms) {
            if next.deadline_ms > self.clock.now_ms() {
                self.clock.set(next.deadline_ms);
            }
            // Queue lock is released; callbacks may schedule or cancel.
            (next.callback)();
            fired += 1;
        }
        fired
    }

    fn pop_due(&self, target_ms: i64) -> Option<Scheduled> {
        let mut queue = self.queue.lock();
        let idx = queue
            .iter()
            .enumerate()
            .filter(|(_, s)| s.deadline_ms <= target_ms)
            .min_by_key(|(_, s)| (s.deadline_ms, s.id))
            .map(|(i, _)| i)?;
        Some(queue.swap_remove(idx))
    }
}

impl TimerFacility for ManualTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delta = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let deadline_ms = self.clock.now_ms().saturating_add(delta);
        self.queue.lock().push(Scheduled { id, deadline_ms, callback });
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.queue.lock().retain(|s| s.id != handle.0);
    }
}
