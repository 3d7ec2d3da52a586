use crate::config::ApiConfig;
use crate::error::{RemoteError, Result};
use crate::types::{ChapterDraft, Credential, ExistingChapter};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_UNAUTHORIZED: &str = "Not signed in or the session has expired";
const DEFAULT_FAILURE: &str = "Request failed";
const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The content API as seen by the import pipeline.
#[async_trait]
pub trait ChapterStore: Send + Sync {
    async fn list_chapters(&self, book_id: i64) -> RemoteResult<Vec<ExistingChapter>>;

    async fn delete_chapter(
        &self,
        book_id: i64,
        chapter_id: i64,
        credential: &Credential,
    ) -> RemoteResult<()>;

    async fn create_chapter(
        &self,
        book_id: i64,
        draft: &ChapterDraft,
    ) -> RemoteResult<ExistingChapter>;

    async fn update_chapter(
        &self,
        book_id: i64,
        chapter_id: i64,
        draft: &ChapterDraft,
    ) -> RemoteResult<ExistingChapter>;
}

/// `ChapterStore` over the HTTP/JSON content API.
pub struct HttpChapterStore {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpChapterStore {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn chapters_path(book_id: i64) -> String {
        format!("/contents/{}/chapters", book_id)
    }

    fn chapter_path(book_id: i64, chapter_id: i64) -> String {
        format!("/contents/{}/chapters/{}", book_id, chapter_id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> RemoteResult<Value> {
        let request = match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        debug!("Content API answered {} ({} bytes)", status, body.len());

        interpret_response(status, &body)
    }
}

#[async_trait]
impl ChapterStore for HttpChapterStore {
    async fn list_chapters(&self, book_id: i64) -> RemoteResult<Vec<ExistingChapter>> {
        let url = self.config.endpoint(&Self::chapters_path(book_id));
        let payload = self.send(self.client.get(url)).await?;
        chapter_list(payload)
    }

    async fn delete_chapter(
        &self,
        book_id: i64,
        chapter_id: i64,
        credential: &Credential,
    ) -> RemoteResult<()> {
        let url = self
            .config
            .endpoint(&Self::chapter_path(book_id, chapter_id));
        let request = self
            .client
            .delete(url)
            .header(ADMIN_PASSWORD_HEADER, credential.expose());
        self.send(request).await?;
        Ok(())
    }

    async fn create_chapter(
        &self,
        book_id: i64,
        draft: &ChapterDraft,
    ) -> RemoteResult<ExistingChapter> {
        let url = self.config.endpoint(&Self::chapters_path(book_id));
        let payload = self.send(self.client.post(url).json(draft)).await?;
        single_chapter(payload)
    }

    async fn update_chapter(
        &self,
        book_id: i64,
        chapter_id: i64,
        draft: &ChapterDraft,
    ) -> RemoteResult<ExistingChapter> {
        let url = self
            .config
            .endpoint(&Self::chapter_path(book_id, chapter_id));
        let payload = self.send(self.client.put(url).json(draft)).await?;
        single_chapter(payload)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    warn!("Content API request did not complete: {}", e);
    RemoteError::RequestFailed {
        message: e.to_string(),
    }
}

fn error_message(data: &Value) -> Option<String> {
    ["msg", "error", "message"]
        .iter()
        .filter_map(|key| data.get(key).and_then(Value::as_str))
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Maps a status code and raw body to the payload or a `RemoteError`.
///
/// Bodies that parse as JSON are inspected; anything else is kept as a string.
/// A success body shaped `{ code, msg, data }` is an envelope whose non-zero
/// `code` is a failure.
pub fn interpret_response(status: u16, body: &str) -> RemoteResult<Value> {
    let data = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    };

    if status == 401 {
        return Err(RemoteError::Unauthorized {
            message: error_message(&data).unwrap_or_else(|| DEFAULT_UNAUTHORIZED.to_string()),
        });
    }

    if !(200..300).contains(&status) {
        return Err(RemoteError::RequestFailed {
            message: error_message(&data).unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
        });
    }

    match data {
        Value::Object(mut map) if map.contains_key("code") && map.contains_key("msg") => {
            if map.get("code").and_then(Value::as_i64) != Some(0) {
                let message = map
                    .get("msg")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_FAILURE)
                    .to_string();
                return Err(RemoteError::RequestFailed { message });
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn malformed(what: &str, e: serde_json::Error) -> RemoteError {
    RemoteError::RequestFailed {
        message: format!("Malformed {} in response: {}", what, e),
    }
}

/// Accepts a bare array or a `{ data: [...] }` wrapper.
pub fn chapter_list(payload: Value) -> RemoteResult<Vec<ExistingChapter>> {
    let items = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(items) => items,
        },
        other => other,
    };
    serde_json::from_value(items).map_err(|e| malformed("chapter list", e))
}

fn single_chapter(payload: Value) -> RemoteResult<ExistingChapter> {
    let item = match payload {
        Value::Object(mut map) if !map.contains_key("id") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(item).map_err(|e| malformed("chapter", e))
}
