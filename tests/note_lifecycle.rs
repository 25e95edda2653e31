use async_trait::async_trait;
use paperkb_app::api::{ApiError, ApiErrorKind, ApiResult, NoteStore};
use paperkb_app::config::{EditorConfig, EditorMode};
use paperkb_app::lifecycle::{ExitTrigger, Finalization, LifecycleState, NoteEditorHost};
use paperkb_app::models::{Block, NoteId, NoteRecord, NoteUpdate, Scope};
use paperkb_app::runtime::ManualRuntime;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn not_found() -> ApiError {
    ApiError {
        kind: ApiErrorKind::NotFound,
        message: "Note not found".to_string(),
    }
}

#[derive(Default)]
struct MemoryStore {
    notes: RefCell<Vec<NoteRecord>>,
    updates: RefCell<Vec<(NoteId, NoteUpdate)>>,
    deletes: RefCell<Vec<NoteId>>,
    next_id: Cell<NoteId>,
}

#[async_trait(?Send)]
impl NoteStore for MemoryStore {
    async fn create_note(&self, paper_id: &str, title: &str, _scope: Scope) -> ApiResult<NoteRecord> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let rec = NoteRecord {
            id,
            paper_id: paper_id.to_string(),
            kind: "markdown".to_string(),
            title: title.to_string(),
            content: Some(String::new()),
            created_at: String::new(),
            updated_at: String::new(),
        };
        self.notes.borrow_mut().push(rec.clone());
        Ok(rec)
    }

    async fn get_note(&self, id: NoteId) -> ApiResult<NoteRecord> {
        self.notes
            .borrow()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_note(&self, id: NoteId, update: &NoteUpdate) -> ApiResult<NoteRecord> {
        self.updates.borrow_mut().push((id, update.clone()));
        let mut notes = self.notes.borrow_mut();
        let Some(note) = notes.iter_mut().find(|n| n.id == id) else {
            return Err(not_found());
        };
        if let Some(t) = &update.title {
            note.title = t.clone();
        }
        if let Some(c) = &update.content {
            note.content = Some(c.clone());
        }
        Ok(note.clone())
    }

    async fn delete_note(&self, id: NoteId) -> ApiResult<()> {
        self.deletes.borrow_mut().push(id);
        self.notes.borrow_mut().retain(|n| n.id != id);
        Ok(())
    }
}

fn setup() -> (Rc<ManualRuntime>, Rc<MemoryStore>, NoteEditorHost) {
    let rt = Rc::new(ManualRuntime::new());
    let store = Rc::new(MemoryStore::default());
    let host = NoteEditorHost::new(
        store.clone(),
        rt.clone(),
        EditorConfig {
            autosave_delay: Duration::from_millis(2000),
            mode: EditorMode::Routed,
        },
        Scope::Kb,
    );
    (rt, store, host)
}

#[test]
fn untouched_new_note_is_deleted_on_leave() {
    let (rt, store, host) = setup();
    let ctl = rt.block_on(host.create_note("2401.00001")).expect("created");
    let id = ctl.document().id();

    let out = rt.block_on(host.close(ExitTrigger::LeaveRoute));

    assert_eq!(out, Some(Finalization::Deleted));
    assert_eq!(*store.deletes.borrow(), vec![id]);
    assert!(store.updates.borrow().is_empty());
    assert!(store.notes.borrow().is_empty());
}

#[test]
fn typed_note_is_saved_on_leave() {
    let (rt, store, host) = setup();
    let ctl = rt.block_on(host.create_note("2401.00001")).expect("created");
    ctl.edit_content(vec![Block::paragraph("Hello")]);

    // Leave before the debounce window closes.
    rt.advance(Duration::from_millis(500));
    let out = rt.block_on(host.close(ExitTrigger::LeaveRoute));
    rt.advance(Duration::from_secs(10));

    assert_eq!(out, Some(Finalization::Flushed));
    assert!(store.deletes.borrow().is_empty());
    let updates = store.updates.borrow();
    assert_eq!(updates.len(), 1);
    let content = updates[0].1.content.as_deref().unwrap_or_default();
    assert!(content.contains("Hello"));
    assert_eq!(updates[0].1.title.as_deref(), Some("Hello"));
}

#[test]
fn quick_typing_coalesces_into_one_autosave() {
    let (rt, store, host) = setup();
    let ctl = rt.block_on(host.create_note("2401.00001")).expect("created");

    for text in ["H", "He", "Hel", "Hell", "Hello"] {
        ctl.edit_content(vec![Block::paragraph(text)]);
        rt.advance(Duration::from_millis(150));
    }
    assert!(store.updates.borrow().is_empty());

    rt.advance(Duration::from_millis(1850));
    assert_eq!(store.updates.borrow().len(), 1);

    // Already synced: leaving neither writes again nor deletes.
    rt.block_on(host.close(ExitTrigger::SwitchDocument));
    assert_eq!(store.updates.borrow().len(), 1);
    assert!(store.deletes.borrow().is_empty());
}

#[test]
fn competing_exit_triggers_finalize_once() {
    let (rt, store, host) = setup();
    let ctl = rt.block_on(host.create_note("2401.00001")).expect("created");

    let a = ctl.finalize(ExitTrigger::LeaveRoute);
    let b = ctl.finalize(ExitTrigger::Unmount);
    let c = ctl.finalize(ExitTrigger::SaveAndClose);
    let results = rt.block_on(futures::future::join3(a, b, c));

    assert_eq!(
        results,
        (Finalization::Deleted, Finalization::Skipped, Finalization::Skipped)
    );
    assert_eq!(store.deletes.borrow().len(), 1);
    assert!(store.updates.borrow().is_empty());
    assert_eq!(ctl.state(), LifecycleState::Closed);
}

#[test]
fn save_and_close_keeps_empty_note() {
    let (rt, store, host) = setup();
    rt.block_on(host.create_note("2401.00001")).expect("created");

    let out = rt.block_on(host.close(ExitTrigger::SaveAndClose));
    assert_eq!(out, Some(Finalization::Flushed));
    assert!(store.deletes.borrow().is_empty());
    assert_eq!(store.notes.borrow().len(), 1);
}
