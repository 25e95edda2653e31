//! Bindings between the headless state machines and the leptos view layer.

mod analysis;
mod leave_guard;

pub use analysis::AnalysisPanel;
pub use leave_guard::LeaveGuard;

use crate::api::ApiClient;
use crate::config::EnvConfig;
use crate::lifecycle::NoteEditorHost;
use crate::models::Scope;
use crate::runtime::{BrowserRuntime, Runtime};
use std::rc::Rc;

/// Everything a page needs to edit notes and run comparisons against one backend.
#[derive(Clone)]
pub struct AppState {
    pub config: EnvConfig,
    pub api_client: Rc<ApiClient>,
    pub runtime: Rc<dyn Runtime>,
    pub notes: Rc<NoteEditorHost>,
}

impl AppState {
    pub fn new(scope: Scope) -> Self {
        Self::with_config(EnvConfig::new(), Rc::new(BrowserRuntime), scope)
    }

    pub fn with_config(config: EnvConfig, runtime: Rc<dyn Runtime>, scope: Scope) -> Self {
        let api_client = Rc::new(ApiClient::from_config(&config));
        let notes = Rc::new(NoteEditorHost::new(
            api_client.clone(),
            runtime.clone(),
            config.editor(),
            scope,
        ));
        Self {
            config,
            api_client,
            runtime,
            notes,
        }
    }

    pub fn analysis_panel(&self) -> AnalysisPanel {
        AnalysisPanel::new(self.api_client.clone(), self.runtime.clone())
    }

    /// Route-leave source for the note lifecycle; keep the guard alive while editing.
    pub fn leave_guard(&self) -> LeaveGuard {
        LeaveGuard::install(self.notes.clone(), self.runtime.clone())
    }
}
