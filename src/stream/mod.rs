//! Incremental consumer for the comparison-analysis event stream.

mod frame;
mod session;

pub use frame::{Frame, FrameDecoder, DATA_PREFIX, DONE_SENTINEL};
pub use session::{SessionEvent, SessionState, StreamSession};

use crate::models::Scope;
use async_trait::async_trait;
use futures::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const MIN_COMPARE_PAPERS: usize = 2;
pub const MAX_COMPARE_PAPERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Non-2xx response; the body is what the user sees.
    #[error("{body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("stream interrupted: {0}")]
    Interrupted(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub paper_ids: Vec<String>,
    #[serde(default)]
    pub scope: Scope,
}

impl AnalysisRequest {
    /// The compare endpoint accepts between two and five papers.
    pub fn new(paper_ids: Vec<String>, scope: Scope) -> Result<Self, StreamError> {
        let n = paper_ids.len();
        if !(MIN_COMPARE_PAPERS..=MAX_COMPARE_PAPERS).contains(&n) {
            return Err(StreamError::InvalidRequest(format!(
                "expected {MIN_COMPARE_PAPERS}-{MAX_COMPARE_PAPERS} papers, got {n}"
            )));
        }
        if paper_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(StreamError::InvalidRequest("empty paper id".to_string()));
        }
        Ok(Self { paper_ids, scope })
    }
}

/// Body chunks as they arrive off the wire.
pub type ByteStream = LocalBoxStream<'static, Result<Vec<u8>, StreamError>>;

#[async_trait(?Send)]
pub trait StreamTransport {
    /// Open the response. `cancel` must end in-flight reads promptly, and a cancelled
    /// read ends the stream rather than yielding an error.
    async fn open(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, StreamError>;
}
