use crate::lifecycle::{ExitTrigger, NoteEditorHost};
use crate::runtime::Runtime;
use leptos::ev;
use leptos::prelude::*;
use std::rc::Rc;

/// Finalizes the open note when the page is hidden (tab closed, navigated away,
/// bfcache). Requests started here are best effort.
pub struct LeaveGuard {
    handle: WindowListenerHandle,
}

impl LeaveGuard {
    pub fn install(host: Rc<NoteEditorHost>, runtime: Rc<dyn Runtime>) -> Self {
        let handle = window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
            let host = host.clone();
            runtime.spawn(Box::pin(async move {
                if let Some(outcome) = host.close(ExitTrigger::LeaveRoute).await {
                    tracing::debug!(?outcome, "note finalized on pagehide");
                }
            }));
        });
        Self { handle }
    }

    pub fn remove(self) {
        self.handle.remove();
    }
}
