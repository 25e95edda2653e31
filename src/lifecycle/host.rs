use super::{ExitTrigger, Finalization, LifecycleController};
use crate::api::{ApiResult, NoteStore};
use crate::config::EditorConfig;
use crate::document::{DocumentModel, DEFAULT_NOTE_TITLE};
use crate::models::{NoteId, Scope};
use crate::runtime::Runtime;
use std::cell::RefCell;
use std::rc::Rc;

/// Keeps at most one note open and finalizes it before anything else is opened.
pub struct NoteEditorHost {
    store: Rc<dyn NoteStore>,
    runtime: Rc<dyn Runtime>,
    config: EditorConfig,
    scope: Scope,
    current: RefCell<Option<LifecycleController>>,
}

impl NoteEditorHost {
    pub fn new(
        store: Rc<dyn NoteStore>,
        runtime: Rc<dyn Runtime>,
        config: EditorConfig,
        scope: Scope,
    ) -> Self {
        Self {
            store,
            runtime,
            config,
            scope,
            current: RefCell::new(None),
        }
    }

    pub fn current(&self) -> Option<LifecycleController> {
        self.current.borrow().clone()
    }

    /// Opening the note that is already open returns its controller untouched.
    pub async fn open_note(&self, id: NoteId) -> ApiResult<LifecycleController> {
        if let Some(current) = self.current() {
            if current.document().id() == id && !current.is_finalized() {
                return Ok(current);
            }
        }

        self.close(ExitTrigger::SwitchDocument).await;
        let record = self.store.get_note(id).await?;
        Ok(self.install(DocumentModel::from_record(&record)))
    }

    /// Create a blank note under `paper_id` and open it.
    pub async fn create_note(&self, paper_id: &str) -> ApiResult<LifecycleController> {
        self.close(ExitTrigger::SwitchDocument).await;
        let record = self
            .store
            .create_note(paper_id, DEFAULT_NOTE_TITLE, self.scope)
            .await?;
        tracing::info!(note_id = record.id, paper_id, "note created");
        Ok(self.install(DocumentModel::from_record(&record)))
    }

    /// Finalize the open note, if any. `None` when nothing was open.
    pub async fn close(&self, trigger: ExitTrigger) -> Option<Finalization> {
        // Detach before awaiting so a second close finds nothing to do.
        let current = self.current.borrow_mut().take()?;
        Some(current.finalize(trigger).await)
    }

    fn install(&self, document: DocumentModel) -> LifecycleController {
        let controller = LifecycleController::new(
            Rc::new(document),
            self.store.clone(),
            self.runtime.clone(),
            &self.config,
        );

        // Two overlapping opens: the one that lost the race still gets its exit.
        let previous = self.current.borrow_mut().replace(controller.clone());
        if let Some(prev) = previous {
            self.runtime.spawn(Box::pin(async move {
                prev.finalize(ExitTrigger::SwitchDocument).await;
            }));
        }
        controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorMode;
    use crate::lifecycle::tests::{Call, RecordingStore};
    use crate::lifecycle::LifecycleState;
    use crate::models::Block;
    use crate::runtime::ManualRuntime;

    fn host(store: Rc<RecordingStore>) -> (Rc<ManualRuntime>, NoteEditorHost) {
        let rt = Rc::new(ManualRuntime::new());
        let h = NoteEditorHost::new(
            store,
            rt.clone(),
            EditorConfig {
                autosave_delay: std::time::Duration::from_millis(2000),
                mode: EditorMode::Routed,
            },
            Scope::Kb,
        );
        (rt, h)
    }

    #[test]
    fn test_switching_deletes_untouched_new_note() {
        let store = Rc::new(RecordingStore::with_note(1, "Reading notes", "kept"));
        let (rt, h) = host(store.clone());

        let created = rt.block_on(h.create_note("2401.00001")).expect("created");
        let new_id = created.document().id();

        let opened = rt.block_on(h.open_note(1)).expect("opened");
        assert_eq!(opened.document().title(), "Reading notes");
        assert_eq!(created.state(), LifecycleState::Closed);

        assert_eq!(
            *store.calls.borrow(),
            vec![
                Call::Create("2401.00001".to_string()),
                Call::Delete(new_id),
                Call::Get(1),
            ]
        );
    }

    #[test]
    fn test_close_twice_finalizes_once() {
        let store = Rc::new(RecordingStore::with_note(1, "Reading notes", "kept"));
        let (rt, h) = host(store.clone());
        let ctl = rt.block_on(h.open_note(1)).expect("opened");
        ctl.edit_content(vec![Block::paragraph("kept, and more")]);

        let first = rt.block_on(h.close(ExitTrigger::LeaveRoute));
        let second = rt.block_on(h.close(ExitTrigger::LeaveRoute));
        assert_eq!(first, Some(Finalization::Flushed));
        assert_eq!(second, None);
        assert_eq!(store.updates(), 1);
        assert!(h.current().is_none());
    }

    #[test]
    fn test_open_missing_note_reports_error() {
        let store = Rc::new(RecordingStore::default());
        let (rt, h) = host(store);
        let err = rt.block_on(h.open_note(404)).err().expect("missing note");
        assert!(err.is_not_found());
        assert!(h.current().is_none());
    }

    #[test]
    fn test_reopening_current_note_keeps_it() {
        let store = Rc::new(RecordingStore::default());
        let (rt, h) = host(store.clone());

        let created = rt.block_on(h.create_note("p")).expect("created");
        let id = created.document().id();

        let again = rt.block_on(h.open_note(id)).expect("same note");
        assert_eq!(again.document().id(), id);
        assert_eq!(again.state(), LifecycleState::Editing);
        assert_eq!(store.deletes(), 0);
        assert_eq!(*store.calls.borrow(), vec![Call::Create("p".to_string())]);
    }
}
