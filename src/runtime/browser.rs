use super::{Runtime, TimerId};
use futures::future::LocalBoxFuture;
use std::time::Duration;
use wasm_bindgen::JsCast;

/// `window.setTimeout` / `clearTimeout` and `spawn_local`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserRuntime;

impl Runtime for BrowserRuntime {
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Option<TimerId> {
        let win = web_sys::window()?;

        let cb = wasm_bindgen::closure::Closure::once_into_js(move || task());
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);

        win.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            delay_ms,
        )
        .ok()
        .map(|tid| TimerId(tid as u64))
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(win) = web_sys::window() {
            let _ = win.clear_timeout_with_handle(id.0 as i32);
        }
    }

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        leptos::task::spawn_local(fut);
    }
}
