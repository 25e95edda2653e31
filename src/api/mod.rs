use crate::config::EnvConfig;
use crate::models::{
    CompareResultRecord, CreateNoteRequest, FolderId, FolderRecord, KbTree, NoteId,
    NoteListResponse, NoteRecord, NoteUpdate, SaveCompareResultRequest, Scope,
};
use crate::stream::{AnalysisRequest, ByteStream, StreamError, StreamTransport};
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    NotFound,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    pub(crate) fn not_found(body: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: body,
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The note persistence surface the editor depends on.
#[async_trait(?Send)]
pub trait NoteStore {
    async fn create_note(&self, paper_id: &str, title: &str, scope: Scope) -> ApiResult<NoteRecord>;

    async fn get_note(&self, id: NoteId) -> ApiResult<NoteRecord>;

    /// Partial, idempotent update; returns the stored form.
    async fn update_note(&self, id: NoteId, update: &NoteUpdate) -> ApiResult<NoteRecord>;

    /// Deleting a note that is already gone yields a `NotFound` error.
    async fn delete_note(&self, id: NoteId) -> ApiResult<()>;
}

#[derive(Clone)]
pub struct ApiClient {
    pub(crate) base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        req: reqwest::RequestBuilder,
        ctx: &str,
    ) -> ApiResult<T> {
        let res = req.send().await.map_err(ApiError::network)?;

        let status = res.status();
        if status.is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if status.as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else if status.as_u16() == 404 {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::not_found(body))
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    pub async fn get_kb_tree(&self, scope: Scope) -> ApiResult<KbTree> {
        let req = self
            .http
            .get(self.url("/api/kb/tree"))
            .query(&[("scope", scope.as_ref())]);
        Self::send_json(req, "Load knowledge base failed").await
    }

    /// The returned row is authoritative: the backend silently refuses moves that
    /// would create a cycle. See [`KbTree::apply_folder_move`].
    pub async fn move_folder(
        &self,
        folder_id: FolderId,
        target_parent_id: Option<FolderId>,
        scope: Scope,
    ) -> ApiResult<FolderRecord> {
        let req = self
            .http
            .patch(self.url(&format!("/api/kb/folders/{folder_id}/move")))
            .json(&serde_json::json!({
                "target_parent_id": target_parent_id,
                "scope": scope,
            }));
        Self::send_json(req, "Move folder failed").await
    }

    pub async fn list_notes(&self, paper_id: &str, scope: Scope) -> ApiResult<Vec<NoteRecord>> {
        let path = format!("/api/kb/papers/{}/notes", urlencoding::encode(paper_id));
        let req = self
            .http
            .get(self.url(&path))
            .query(&[("scope", scope.as_ref())]);
        let data: NoteListResponse = Self::send_json(req, "List notes failed").await?;
        Ok(data.notes)
    }

    pub async fn save_compare_result(
        &self,
        body: &SaveCompareResultRequest,
    ) -> ApiResult<CompareResultRecord> {
        let req = self.http.post(self.url("/api/kb/compare-results")).json(body);
        Self::send_json(req, "Save analysis failed").await
    }
}

#[async_trait(?Send)]
impl NoteStore for ApiClient {
    async fn create_note(&self, paper_id: &str, title: &str, scope: Scope) -> ApiResult<NoteRecord> {
        let path = format!("/api/kb/papers/{}/notes", urlencoding::encode(paper_id));
        let req = self.http.post(self.url(&path)).json(&CreateNoteRequest {
            title: title.to_string(),
            content: String::new(),
            scope,
        });
        Self::send_json(req, "Create note failed").await
    }

    async fn get_note(&self, id: NoteId) -> ApiResult<NoteRecord> {
        let req = self.http.get(self.url(&format!("/api/kb/notes/{id}")));
        Self::send_json(req, "Load note failed").await
    }

    async fn update_note(&self, id: NoteId, update: &NoteUpdate) -> ApiResult<NoteRecord> {
        let req = self
            .http
            .patch(self.url(&format!("/api/kb/notes/{id}")))
            .json(update);
        Self::send_json(req, "Save note failed").await
    }

    async fn delete_note(&self, id: NoteId) -> ApiResult<()> {
        let req = self.http.delete(self.url(&format!("/api/kb/notes/{id}")));
        let _: serde_json::Value = Self::send_json(req, "Delete note failed").await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl StreamTransport for ApiClient {
    async fn open(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, StreamError> {
        let res = self
            .http
            .post(self.url("/api/kb/compare"))
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Dropping the body aborts the underlying fetch.
        let token = cancel.clone();
        let body = res
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|b| b.to_vec())
                    .map_err(|e| StreamError::Interrupted(e.to_string()))
            })
            .take_until(async move { token.cancelled().await })
            .boxed_local();
        Ok(body)
    }
}
