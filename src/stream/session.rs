use super::{AnalysisRequest, Frame, FrameDecoder, StreamTransport};
use crate::observe::{SubscriptionId, Subscribers};
use futures::future::Either;
use futures::StreamExt;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Done,
    Error,
    Cancelled,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Error | SessionState::Cancelled
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new run started; previously rendered text is gone.
    Reset,
    State(SessionState),
    Appended(String),
}

struct Inner {
    state: SessionState,
    text: String,
    error: Option<String>,
    /// Bumped by every `start`; work belonging to an older run is ignored.
    generation: u64,
    cancel: CancellationToken,
}

/// One outstanding analysis request and the document it has produced so far.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct StreamSession {
    inner: Rc<RefCell<Inner>>,
    subscribers: Rc<Subscribers<SessionEvent>>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: SessionState::Idle,
                text: String::new(),
                error: None,
                generation: 0,
                cancel: CancellationToken::new(),
            })),
            subscribers: Rc::new(Subscribers::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.borrow().state
    }

    pub fn text(&self) -> String {
        self.inner.borrow().text.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.borrow().error.clone()
    }

    /// The full document, only once the server finished it.
    pub fn completed_text(&self) -> Option<String> {
        let inner = self.inner.borrow();
        (inner.state == SessionState::Done).then(|| inner.text.clone())
    }

    pub fn subscribe(&self, f: impl Fn(&SessionEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Run one request to a terminal state.
    ///
    /// Any run still active on this session is cancelled first. Failures are recorded
    /// on the session rather than returned.
    pub async fn start<T>(&self, transport: &T, request: &AnalysisRequest)
    where
        T: StreamTransport + ?Sized,
    {
        let (generation, token) = self.begin();
        tracing::debug!(generation, papers = request.paper_ids.len(), "analysis stream opening");

        let opened = or_cancelled(&token, transport.open(request, &token)).await;
        let mut body = match opened {
            None => return,
            Some(Err(e)) => {
                self.fail(generation, e.to_string());
                return;
            }
            Some(Ok(body)) => body,
        };

        if !self.transition(generation, SessionState::Connecting, SessionState::Streaming) {
            return;
        }

        let mut decoder = FrameDecoder::new();
        loop {
            let Some(next) = or_cancelled(&token, body.next()).await else {
                return;
            };
            match next {
                Some(Ok(chunk)) => {
                    for frame in decoder.push(&chunk) {
                        if !self.apply_frame(generation, frame) {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    self.fail(generation, e.to_string());
                    return;
                }
                None => break,
            }
        }

        for frame in decoder.finish() {
            if !self.apply_frame(generation, frame) {
                return;
            }
        }

        // Transports may close cleanly without the sentinel; that still counts as done.
        self.transition(generation, SessionState::Streaming, SessionState::Done);
    }

    /// User-initiated stop. Returns whether an active run was interrupted.
    pub fn cancel(&self) -> bool {
        let token = {
            let mut inner = self.inner.borrow_mut();
            if !inner.state.is_active() {
                return false;
            }
            inner.state = SessionState::Cancelled;
            inner.cancel.clone()
        };

        token.cancel();
        tracing::debug!("analysis stream cancelled");
        self.subscribers
            .notify(&SessionEvent::State(SessionState::Cancelled));
        true
    }

    /// The owning view is going away: abort and drop observers.
    pub fn dispose(&self) {
        self.cancel();
        self.subscribers.clear();
    }

    fn begin(&self) -> (u64, CancellationToken) {
        self.cancel();

        let (generation, token) = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            inner.text.clear();
            inner.error = None;
            inner.state = SessionState::Connecting;
            inner.cancel = CancellationToken::new();
            (inner.generation, inner.cancel.clone())
        };

        self.subscribers.notify(&SessionEvent::Reset);
        self.subscribers
            .notify(&SessionEvent::State(SessionState::Connecting));
        (generation, token)
    }

    /// Returns false once the run is over (sentinel seen, or the run is stale).
    fn apply_frame(&self, generation: u64, frame: Frame) -> bool {
        match frame {
            Frame::Text(text) => self.append(generation, text),
            Frame::Done => {
                self.transition(generation, SessionState::Streaming, SessionState::Done);
                false
            }
        }
    }

    fn append(&self, generation: u64, text: String) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation || inner.state != SessionState::Streaming {
                return false;
            }
            if text.is_empty() {
                return true;
            }
            inner.text.push_str(&text);
        }

        self.subscribers.notify(&SessionEvent::Appended(text));
        true
    }

    fn transition(&self, generation: u64, from: SessionState, to: SessionState) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation || inner.state != from {
                return false;
            }
            inner.state = to;
        }

        tracing::debug!(generation, state = %to, "analysis stream state");
        self.subscribers.notify(&SessionEvent::State(to));
        true
    }

    fn fail(&self, generation: u64, message: String) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation || !inner.state.is_active() {
                return;
            }
            inner.state = SessionState::Error;
            inner.error = Some(message.clone());
        }

        tracing::warn!(generation, error = %message, "analysis stream failed");
        self.subscribers
            .notify(&SessionEvent::State(SessionState::Error));
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

async fn or_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    let cancelled = token.cancelled();
    futures::pin_mut!(fut);
    futures::pin_mut!(cancelled);
    match futures::future::select(fut, cancelled).await {
        Either::Left((out, _)) => Some(out),
        Either::Right(_) => None,
    }
}
