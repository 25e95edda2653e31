//! Debounced persistence for the open note.

use crate::api::ApiError;
use crate::runtime::{Runtime, TimerId};
use async_trait::async_trait;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

pub const DEFAULT_AUTOSAVE_MS: u64 = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved,
    /// Nothing was unsynced; no request was made.
    Unchanged,
}

#[async_trait(?Send)]
pub trait Persist {
    async fn persist(&self) -> Result<PersistOutcome, ApiError>;
}

type PersistJob = Shared<LocalBoxFuture<'static, Result<PersistOutcome, ApiError>>>;

struct Inner {
    runtime: Rc<dyn Runtime>,
    delay: Duration,
    target: Rc<dyn Persist>,
    pending: Cell<Option<TimerId>>,
    /// Most recently queued persist. Each new one starts only after it settles.
    last_job: RefCell<Option<PersistJob>>,
}

impl Inner {
    /// Queue a persist behind any in flight, so writes reach the backend in order and
    /// each one reads the document state as of when it actually runs.
    fn enqueue(&self) -> PersistJob {
        let previous = self.last_job.borrow_mut().take();
        let target = self.target.clone();
        let job = async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            target.persist().await
        }
        .boxed_local()
        .shared();

        *self.last_job.borrow_mut() = Some(job.clone());
        job
    }
}

/// Coalesces bursts of edits into one persist `delay` after the last edit.
#[derive(Clone)]
pub struct AutosaveScheduler {
    inner: Rc<Inner>,
}

impl AutosaveScheduler {
    pub fn new(runtime: Rc<dyn Runtime>, delay: Duration, target: Rc<dyn Persist>) -> Self {
        Self {
            inner: Rc::new(Inner {
                runtime,
                delay,
                target,
                pending: Cell::new(None),
                last_job: RefCell::new(None),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn has_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Restart the debounce window.
    pub fn on_edit(&self) {
        self.cancel_pending();

        // The timer must not keep a dropped scheduler alive.
        let weak = Rc::downgrade(&self.inner);
        let id = self.inner.runtime.set_timeout(
            self.inner.delay,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.pending.set(None);

                let job = inner.enqueue();
                inner.runtime.spawn(Box::pin(async move {
                    match job.await {
                        Ok(outcome) => tracing::debug!(?outcome, "autosave finished"),
                        // The next edit or flush retries.
                        Err(e) => tracing::warn!(error = %e, "autosave failed"),
                    }
                }));
            }),
        );

        if id.is_none() {
            tracing::warn!("autosave timer could not be armed");
        }
        self.inner.pending.set(id);
    }

    /// Returns whether a timer was actually pending.
    pub fn cancel_pending(&self) -> bool {
        match self.inner.pending.take() {
            Some(id) => {
                self.inner.runtime.clear_timeout(id);
                true
            }
            None => false,
        }
    }

    /// Persist now, skipping the remaining debounce window. Waits for a persist that
    /// is already in flight before writing.
    pub async fn flush(&self) -> Result<PersistOutcome, ApiError> {
        self.cancel_pending();
        self.inner.enqueue().await
    }

    /// Wait for queued persists to settle without starting a new one.
    pub async fn settle(&self) {
        let last = self.inner.last_job.borrow().clone();
        if let Some(job) = last {
            let _ = job.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualRuntime;
    use futures::channel::oneshot;

    #[derive(Default)]
    struct CountingPersist {
        calls: Cell<usize>,
        finished: Cell<usize>,
        fail: Cell<bool>,
        gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait(?Send)]
    impl Persist for CountingPersist {
        async fn persist(&self) -> Result<PersistOutcome, ApiError> {
            self.calls.set(self.calls.get() + 1);
            let gate = self.gate.borrow_mut().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.finished.set(self.finished.get() + 1);
            if self.fail.get() {
                Err(ApiError::parse("backend down"))
            } else {
                Ok(PersistOutcome::Saved)
            }
        }
    }

    fn setup() -> (Rc<ManualRuntime>, Rc<CountingPersist>, AutosaveScheduler) {
        let rt = Rc::new(ManualRuntime::new());
        let target = Rc::new(CountingPersist::default());
        let sched = AutosaveScheduler::new(
            rt.clone(),
            Duration::from_millis(DEFAULT_AUTOSAVE_MS),
            target.clone(),
        );
        (rt, target, sched)
    }

    #[test]
    fn test_does_not_fire_before_delay() {
        let (rt, target, sched) = setup();
        sched.on_edit();
        rt.advance(Duration::from_millis(1999));
        assert_eq!(target.calls.get(), 0);
        assert!(sched.has_pending());

        rt.advance(Duration::from_millis(1));
        assert_eq!(target.calls.get(), 1);
        assert!(!sched.has_pending());
    }

    #[test]
    fn test_quick_edits_coalesce_into_one_persist() {
        let (rt, target, sched) = setup();
        for _ in 0..5 {
            sched.on_edit();
            rt.advance(Duration::from_millis(100));
        }
        assert_eq!(target.calls.get(), 0);

        // Last edit was 100ms ago.
        rt.advance(Duration::from_millis(1899));
        assert_eq!(target.calls.get(), 0);
        rt.advance(Duration::from_millis(1));
        assert_eq!(target.calls.get(), 1);
        assert_eq!(rt.pending_timers(), 0);
    }

    #[test]
    fn test_slow_edits_persist_each_time() {
        let (rt, target, sched) = setup();
        for _ in 0..3 {
            sched.on_edit();
            rt.advance(Duration::from_millis(2500));
        }
        assert_eq!(target.calls.get(), 3);
    }

    #[test]
    fn test_flush_cancels_pending_timer() {
        let (rt, target, sched) = setup();
        sched.on_edit();

        let outcome = rt.block_on(sched.flush()).expect("flush ok");
        assert_eq!(outcome, PersistOutcome::Saved);
        assert_eq!(target.calls.get(), 1);
        assert_eq!(rt.pending_timers(), 0);

        rt.advance(Duration::from_secs(10));
        assert_eq!(target.calls.get(), 1);
    }

    #[test]
    fn test_failed_autosave_is_not_retried() {
        let (rt, target, sched) = setup();
        target.fail.set(true);
        sched.on_edit();
        rt.advance(Duration::from_millis(2000));
        assert_eq!(target.calls.get(), 1);

        rt.advance(Duration::from_secs(60));
        assert_eq!(target.calls.get(), 1);
        assert!(!sched.has_pending());
    }

    #[test]
    fn test_dropped_scheduler_does_not_fire() {
        let (rt, target, sched) = setup();
        sched.on_edit();
        drop(sched);
        rt.advance(Duration::from_secs(5));
        assert_eq!(target.calls.get(), 0);
    }

    #[test]
    fn test_flush_waits_for_in_flight_autosave() {
        let (rt, target, sched) = setup();
        let (release, gate) = oneshot::channel();
        *target.gate.borrow_mut() = Some(gate);

        sched.on_edit();
        rt.advance(Duration::from_millis(2000));
        assert_eq!(target.calls.get(), 1);

        let flushed = Rc::new(Cell::new(false));
        let f = flushed.clone();
        let s2 = sched.clone();
        rt.spawn(Box::pin(async move {
            s2.flush().await.expect("flush ok");
            f.set(true);
        }));
        rt.run_until_stalled();

        // The flush has not started its own write yet.
        assert_eq!(target.calls.get(), 1);
        assert!(!flushed.get());

        release.send(()).expect("autosave still waiting");
        rt.run_until_stalled();
        assert_eq!(target.calls.get(), 2);
        assert_eq!(target.finished.get(), 2);
        assert!(flushed.get());
    }

    #[test]
    fn test_settle_without_jobs_returns_immediately() {
        let (rt, target, sched) = setup();
        rt.block_on(sched.settle());
        assert_eq!(target.calls.get(), 0);
    }
}
