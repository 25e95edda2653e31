//! In-memory model of one editable note.

mod content;
mod emptiness;

pub use content::{derive_title, parse_content, plain_text, serialize_content, DERIVED_TITLE_MAX_CHARS};
pub use emptiness::{is_empty, is_placeholder_title, DEFAULT_NOTE_TITLE, PLACEHOLDER_TITLES};

use crate::models::{Block, NoteId, NoteRecord, NoteUpdate};
use crate::observe::{SubscriptionId, Subscribers};
use std::cell::RefCell;

/// A `(title, content)` pair as written to, or read from, the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub title: String,
    pub content: Vec<Block>,
    /// Edit count when the snapshot was taken.
    revision: u64,
}

impl DocumentSnapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentEvent {
    TitleChanged(String),
    ContentChanged,
    Persisted,
}

struct DocumentState {
    title: String,
    content: Vec<Block>,
    title_is_user_owned: bool,
    /// Title to fall back to while auto-deriving and the content has no text.
    placeholder_title: String,
    /// Bumped by every edit that changes title or content.
    revision: u64,
    last_persisted: Option<DocumentSnapshot>,
}

/// Mutations go through `&self` and notify subscribers after the internal borrow is
/// released, so observers may read the model back.
pub struct DocumentModel {
    id: NoteId,
    state: RefCell<DocumentState>,
    subscribers: Subscribers<DocumentEvent>,
}

impl DocumentModel {
    /// A document whose current state is exactly what the backend holds.
    pub fn new(id: NoteId, title: impl Into<String>, content: Vec<Block>) -> Self {
        let title = title.into();

        // A real title that the content would not produce was typed by someone;
        // placeholders and derived titles keep following the content.
        let title_is_user_owned =
            !is_placeholder_title(&title) && derive_title(&content).as_deref() != Some(title.as_str());
        let placeholder_title = if is_placeholder_title(&title) && !title.trim().is_empty() {
            title.clone()
        } else {
            DEFAULT_NOTE_TITLE.to_string()
        };

        let snapshot = DocumentSnapshot {
            title: title.clone(),
            content: content.clone(),
            revision: 0,
        };

        Self {
            id,
            state: RefCell::new(DocumentState {
                title,
                content,
                title_is_user_owned,
                placeholder_title,
                revision: 0,
                last_persisted: Some(snapshot),
            }),
            subscribers: Subscribers::new(),
        }
    }

    pub fn from_record(record: &NoteRecord) -> Self {
        let content = parse_content(record.content.as_deref().unwrap_or_default());
        Self::new(record.id, record.title.clone(), content)
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn content(&self) -> Vec<Block> {
        self.state.borrow().content.clone()
    }

    pub fn title_is_user_owned(&self) -> bool {
        self.state.borrow().title_is_user_owned
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        let st = self.state.borrow();
        DocumentSnapshot {
            title: st.title.clone(),
            content: st.content.clone(),
            revision: st.revision,
        }
    }

    pub fn plain_text(&self) -> String {
        plain_text(&self.state.borrow().content)
    }

    pub fn is_dirty(&self) -> bool {
        let st = self.state.borrow();
        match &st.last_persisted {
            Some(p) => p.title != st.title || p.content != st.content,
            None => true,
        }
    }

    pub fn is_effectively_empty(&self) -> bool {
        let st = self.state.borrow();
        is_empty(&st.title, &st.content)
    }

    pub fn subscribe(&self, f: impl Fn(&DocumentEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// The user typed in the title field; from now on the title is theirs.
    pub fn set_title(&self, title: &str) {
        let changed = {
            let mut st = self.state.borrow_mut();
            st.title_is_user_owned = true;
            if st.title == title {
                false
            } else {
                st.title = title.to_string();
                st.revision += 1;
                true
            }
        };

        if changed {
            self.subscribers
                .notify(&DocumentEvent::TitleChanged(title.to_string()));
        }
    }

    /// Replace the content tree. Recomputes the title unless the user owns it.
    pub fn set_content(&self, content: Vec<Block>) {
        let (content_changed, new_title) = {
            let mut st = self.state.borrow_mut();
            let content_changed = st.content != content;
            st.content = content;
            if content_changed {
                st.revision += 1;
            }

            let mut new_title = None;
            if !st.title_is_user_owned {
                let derived =
                    derive_title(&st.content).unwrap_or_else(|| st.placeholder_title.clone());
                if derived != st.title {
                    if !content_changed {
                        st.revision += 1;
                    }
                    st.title = derived.clone();
                    new_title = Some(derived);
                }
            }
            (content_changed, new_title)
        };

        if content_changed {
            self.subscribers.notify(&DocumentEvent::ContentChanged);
        }
        if let Some(t) = new_title {
            self.subscribers.notify(&DocumentEvent::TitleChanged(t));
        }
    }

    /// What still has to be written, plus the snapshot that write represents.
    ///
    /// `Ok(None)` when the backend already holds the current state.
    pub fn pending_update(
        &self,
    ) -> Result<Option<(NoteUpdate, DocumentSnapshot)>, serde_json::Error> {
        let st = self.state.borrow();
        let (title_changed, content_changed) = match &st.last_persisted {
            Some(p) => (p.title != st.title, p.content != st.content),
            None => (true, true),
        };
        if !title_changed && !content_changed {
            return Ok(None);
        }

        let update = NoteUpdate {
            title: title_changed.then(|| st.title.clone()),
            content: if content_changed {
                Some(serialize_content(&st.content)?)
            } else {
                None
            },
        };
        let snapshot = DocumentSnapshot {
            title: st.title.clone(),
            content: st.content.clone(),
            revision: st.revision,
        };
        Ok(Some((update, snapshot)))
    }

    /// Record that `snapshot` is now what the backend holds. Edits made while the write
    /// was in flight stay dirty. A snapshot older than the one already recorded is
    /// ignored; returns whether it was taken.
    pub fn mark_persisted(&self, snapshot: DocumentSnapshot) -> bool {
        {
            let mut st = self.state.borrow_mut();
            if let Some(current) = &st.last_persisted {
                if current.revision > snapshot.revision {
                    return false;
                }
            }
            st.last_persisted = Some(snapshot);
        }
        self.subscribers.notify(&DocumentEvent::Persisted);
        true
    }

    pub(crate) fn clear_subscribers(&self) {
        self.subscribers.clear();
    }
}
