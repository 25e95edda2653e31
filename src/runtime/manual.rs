use super::{Runtime, TimerId};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

type TimerKey = (u64, u64); // (due_ms, timer id)

/// Deterministic runtime driven by logical time.
///
/// Timers fire only from [`ManualRuntime::advance`]; spawned tasks run on an internal
/// `LocalPool` whenever time advances or [`ManualRuntime::run_until_stalled`] is called.
pub struct ManualRuntime {
    now_ms: Cell<u64>,
    next_timer: Cell<u64>,
    timers: RefCell<BTreeMap<TimerKey, Box<dyn FnOnce()>>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl ManualRuntime {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            now_ms: Cell::new(0),
            next_timer: Cell::new(1),
            timers: RefCell::new(BTreeMap::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Move logical time forward, firing due timers in order and draining spawned
    /// work after each one.
    pub fn advance(&self, delta: Duration) {
        let target = self.now_ms.get() + delta.as_millis() as u64;
        self.run_until_stalled();

        loop {
            let due = {
                let mut timers = self.timers.borrow_mut();
                match timers.keys().next().copied() {
                    Some(key) if key.0 <= target => timers.remove(&key).map(|t| (key.0, t)),
                    _ => None,
                }
            };
            let Some((at, task)) = due else {
                break;
            };

            self.now_ms.set(at);
            task();
            self.run_until_stalled();
        }

        self.now_ms.set(target);
    }

    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Drive `fut` (and every spawned task) to completion.
    ///
    /// `fut` must not wait on a timer: timers only fire from `advance`.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.pool.borrow_mut().run_until(fut)
    }
}

impl Default for ManualRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for ManualRuntime {
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Option<TimerId> {
        let id = self.next_timer.get();
        self.next_timer.set(id + 1);

        let due = self.now_ms.get() + delay.as_millis() as u64;
        self.timers.borrow_mut().insert((due, id), task);
        Some(TimerId(id))
    }

    fn clear_timeout(&self, id: TimerId) {
        self.timers.borrow_mut().retain(|(_, tid), _| *tid != id.0);
    }

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(fut) {
            tracing::warn!(error = %e, "manual runtime refused a task");
        }
    }
}
