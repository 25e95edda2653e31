//! Browser client for the paper knowledge base: note editing with debounced autosave and
//! save-or-delete on exit, plus the streaming multi-paper comparison view.

pub mod api;
pub mod autosave;
pub mod config;
pub mod document;
pub mod lifecycle;
pub mod models;
pub mod observe;
pub mod runtime;
pub mod state;
pub mod stream;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult, NoteStore};
pub use config::{EditorConfig, EditorMode, EnvConfig};
pub use lifecycle::{ExitTrigger, Finalization, LifecycleController, NoteEditorHost};
pub use stream::{AnalysisRequest, StreamSession, StreamTransport};

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
}
