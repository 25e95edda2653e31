//! Decides, exactly once per opened note, whether leaving it saves or deletes it.

mod host;

pub use host::NoteEditorHost;

use crate::api::{ApiError, NoteStore};
use crate::autosave::{AutosaveScheduler, Persist, PersistOutcome};
use crate::config::{EditorConfig, EditorMode};
use crate::document::DocumentModel;
use crate::models::Block;
use crate::observe::{SubscriptionId, Subscribers};
use crate::runtime::Runtime;
use async_trait::async_trait;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ExitTrigger {
    SaveAndClose,
    SwitchDocument,
    LeaveRoute,
    Unmount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    Editing,
    Leaving,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitAction {
    Flush,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finalization {
    Flushed,
    Deleted,
    /// The note had already been finalized; nothing was done.
    Skipped,
}

/// Unmount is a best-effort flush and never deletes; neither does an embedded editor.
pub fn exit_action(trigger: ExitTrigger, mode: EditorMode, is_empty: bool) -> ExitAction {
    match trigger {
        ExitTrigger::SaveAndClose | ExitTrigger::Unmount => ExitAction::Flush,
        ExitTrigger::SwitchDocument | ExitTrigger::LeaveRoute => {
            if is_empty && mode == EditorMode::Routed {
                ExitAction::Delete
            } else {
                ExitAction::Flush
            }
        }
    }
}

/// Writes whatever part of the document the backend does not have yet.
pub struct DocumentPersister {
    document: Rc<DocumentModel>,
    store: Rc<dyn NoteStore>,
}

impl DocumentPersister {
    pub fn new(document: Rc<DocumentModel>, store: Rc<dyn NoteStore>) -> Self {
        Self { document, store }
    }
}

#[async_trait(?Send)]
impl Persist for DocumentPersister {
    async fn persist(&self) -> Result<PersistOutcome, ApiError> {
        let Some((update, snapshot)) = self.document.pending_update().map_err(ApiError::parse)?
        else {
            return Ok(PersistOutcome::Unchanged);
        };

        let note_id = self.document.id();
        self.store.update_note(note_id, &update).await?;
        tracing::debug!(note_id, "note saved");
        self.document.mark_persisted(snapshot);
        Ok(PersistOutcome::Saved)
    }
}

struct Inner {
    document: Rc<DocumentModel>,
    store: Rc<dyn NoteStore>,
    autosave: AutosaveScheduler,
    mode: EditorMode,
    state: Cell<LifecycleState>,
    finalized: Cell<bool>,
    subscribers: Subscribers<LifecycleState>,
}

/// Owns one open note from the moment it is shown until it is finalized.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Rc<Inner>,
}

impl LifecycleController {
    pub fn new(
        document: Rc<DocumentModel>,
        store: Rc<dyn NoteStore>,
        runtime: Rc<dyn Runtime>,
        config: &EditorConfig,
    ) -> Self {
        let persister = Rc::new(DocumentPersister::new(document.clone(), store.clone()));
        let autosave = AutosaveScheduler::new(runtime, config.autosave_delay, persister);
        tracing::debug!(note_id = document.id(), mode = %config.mode, "note opened");

        Self {
            inner: Rc::new(Inner {
                document,
                store,
                autosave,
                mode: config.mode,
                state: Cell::new(LifecycleState::Editing),
                finalized: Cell::new(false),
                subscribers: Subscribers::new(),
            }),
        }
    }

    pub fn document(&self) -> Rc<DocumentModel> {
        self.inner.document.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    pub fn mode(&self) -> EditorMode {
        self.inner.mode
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.finalized.get()
    }

    pub fn has_pending_autosave(&self) -> bool {
        self.inner.autosave.has_pending()
    }

    pub fn subscribe(&self, f: impl Fn(&LifecycleState) + 'static) -> SubscriptionId {
        self.inner.subscribers.subscribe(f)
    }

    /// Ignored once the note is leaving. Returns whether the edit was applied.
    pub fn edit_title(&self, title: &str) -> bool {
        if self.state() != LifecycleState::Editing {
            return false;
        }
        self.inner.document.set_title(title);
        self.inner.autosave.on_edit();
        true
    }

    /// Ignored once the note is leaving. Returns whether the edit was applied.
    pub fn edit_content(&self, content: Vec<Block>) -> bool {
        if self.state() != LifecycleState::Editing {
            return false;
        }
        self.inner.document.set_content(content);
        self.inner.autosave.on_edit();
        true
    }

    /// Close the note: flush it or delete it, once.
    ///
    /// Any later call returns [`Finalization::Skipped`] without touching the backend.
    /// Backend failures are logged; the note is closed either way.
    pub async fn finalize(&self, trigger: ExitTrigger) -> Finalization {
        let inner = &self.inner;
        let note_id = inner.document.id();

        if inner.finalized.replace(true) {
            tracing::debug!(note_id, %trigger, "note already finalized");
            return Finalization::Skipped;
        }

        inner.autosave.cancel_pending();
        self.set_state(LifecycleState::Leaving);

        let empty = inner.document.is_effectively_empty();
        let action = exit_action(trigger, inner.mode, empty);
        tracing::info!(note_id, %trigger, empty, ?action, "finalizing note");

        let result = match action {
            ExitAction::Delete => {
                // An autosave already on the wire must not land after the delete.
                inner.autosave.settle().await;
                match inner.store.delete_note(note_id).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(note_id, "empty note was already gone");
                    }
                    Err(e) => {
                        tracing::warn!(note_id, error = %e, "failed to delete empty note");
                    }
                }
                Finalization::Deleted
            }
            ExitAction::Flush => {
                if let Err(e) = inner.autosave.flush().await {
                    tracing::warn!(note_id, error = %e, "final save failed");
                }
                Finalization::Flushed
            }
        };

        self.set_state(LifecycleState::Closed);
        inner.document.clear_subscribers();
        inner.subscribers.clear();
        result
    }

    fn set_state(&self, state: LifecycleState) {
        self.inner.state.set(state);
        tracing::debug!(note_id = self.inner.document.id(), %state, "lifecycle state");
        self.inner.subscribers.notify(&state);
    }
}
