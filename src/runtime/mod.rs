//! Timer and task primitives the editor state machines run on.
//!
//! In the browser this is `window.setTimeout` plus the leptos local executor; tests use
//! [`ManualRuntime`], which advances logical time explicitly.

mod browser;
mod manual;

pub use browser::BrowserRuntime;
pub use manual::ManualRuntime;

use futures::future::LocalBoxFuture;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) u64);

pub trait Runtime {
    /// Run `task` once after `delay`. `None` when no timer could be armed.
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Option<TimerId>;

    /// Clearing a timer that already fired is a no-op.
    fn clear_timeout(&self, id: TimerId);

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>);
}
