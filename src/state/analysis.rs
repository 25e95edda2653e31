use crate::models::{FolderId, SaveCompareResultRequest};
use crate::observe::SubscriptionId;
use crate::runtime::Runtime;
use crate::stream::{AnalysisRequest, SessionEvent, SessionState, StreamSession, StreamTransport};
use leptos::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Signals a comparison view renders from, kept in sync with one [`StreamSession`].
#[derive(Clone)]
pub struct AnalysisPanel {
    pub text: RwSignal<String>,
    pub status: RwSignal<SessionState>,
    pub error: RwSignal<Option<String>>,

    session: StreamSession,
    transport: Rc<dyn StreamTransport>,
    runtime: Rc<dyn Runtime>,
    last_request: Rc<RefCell<Option<AnalysisRequest>>>,
    subscription: SubscriptionId,
}

impl AnalysisPanel {
    pub fn new(transport: Rc<dyn StreamTransport>, runtime: Rc<dyn Runtime>) -> Self {
        let text = RwSignal::new(String::new());
        let status = RwSignal::new(SessionState::Idle);
        let error = RwSignal::new(None);

        let session = StreamSession::new();
        // Holds a handle to its own session; dispose() breaks the cycle.
        let s2 = session.clone();
        let subscription = session.subscribe(move |ev| match ev {
            SessionEvent::Reset => {
                text.set(String::new());
                error.set(None);
            }
            SessionEvent::State(state) => {
                status.set(*state);
                if *state == SessionState::Error {
                    error.set(s2.error());
                }
            }
            SessionEvent::Appended(chunk) => text.update(|t| t.push_str(chunk)),
        });

        Self {
            text,
            status,
            error,
            session,
            transport,
            runtime,
            last_request: Rc::new(RefCell::new(None)),
            subscription,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Start a new run, replacing any run in progress.
    pub fn run(&self, request: AnalysisRequest) {
        *self.last_request.borrow_mut() = Some(request.clone());

        let session = self.session.clone();
        let transport = self.transport.clone();
        self.runtime.spawn(Box::pin(async move {
            session.start(transport.as_ref(), &request).await;
        }));
    }

    /// Re-run the last request. Returns false when nothing has run yet.
    pub fn retry(&self) -> bool {
        let last = self.last_request.borrow().clone();
        match last {
            Some(request) => {
                self.run(request);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&self) -> bool {
        self.session.cancel()
    }

    pub fn dispose(&self) {
        self.session.unsubscribe(self.subscription);
        self.session.dispose();
    }

    /// Body for saving the finished analysis. `None` until the run is done.
    pub fn save_request(
        &self,
        title: &str,
        folder_id: Option<FolderId>,
    ) -> Option<SaveCompareResultRequest> {
        let markdown = self.session.completed_text()?;
        let paper_ids = self.last_request.borrow().as_ref()?.paper_ids.clone();
        Some(SaveCompareResultRequest {
            title: title.to_string(),
            markdown,
            paper_ids,
            folder_id,
        })
    }
}
