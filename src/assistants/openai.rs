//! OpenAI Assistants API (v2) client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, info};

use super::{AssistantsApi, FileDownload};
use crate::config::PortalConfig;
use crate::error::{PortalError, Result};
use crate::stream::ByteStream;
use crate::types::ToolOutput;
use crate::util::http::{bearer_headers, shared_client, status_to_error};

/// Client for the thread, message, run and file endpoints.
#[derive(Clone)]
pub struct OpenAiAssistants {
    api_key: String,
    base_url: String,
    assistant_id: String,
}

impl std::fmt::Debug for OpenAiAssistants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistants")
            .field("base_url", &self.base_url)
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

impl OpenAiAssistants {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            assistant_id: assistant_id.into(),
        }
    }

    /// Build from config; requires `OPENAI_API_KEY` and `OPENAI_ASSISTANT_ID`.
    pub fn from_config(config: &PortalConfig) -> Result<Self> {
        Ok(Self::new(
            config.require_api_key()?,
            config.openai_base_url.clone(),
            config.require_assistant_id()?,
        ))
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = bearer_headers(&self.api_key);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));
        headers
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let resp = shared_client()
            .post(&url)
            .headers(self.headers())
            .json(body)
            .send()
            .await?;
        check_status(resp).await
    }
}

#[async_trait]
impl AssistantsApi for OpenAiAssistants {
    async fn create_thread(&self) -> Result<String> {
        let resp = self.post("/threads", &serde_json::json!({})).await?;
        let thread: IdObject = resp.json().await?;
        info!(thread_id = %thread.id, "created thread");
        Ok(thread.id)
    }

    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream> {
        let thread_id = path_id("thread", thread_id)?;
        self.post(
            &format!("/threads/{thread_id}/messages"),
            &serde_json::json!({ "role": "user", "content": content }),
        )
        .await?;

        debug!(thread_id, assistant_id = %self.assistant_id, "opening run stream");
        let resp = self
            .post(
                &format!("/threads/{thread_id}/runs"),
                &serde_json::json!({ "assistant_id": self.assistant_id, "stream": true }),
            )
            .await?;
        Ok(byte_stream(resp))
    }

    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream> {
        let thread_id = path_id("thread", thread_id)?;
        let run_id = path_id("run", run_id)?;
        debug!(thread_id, run_id, outputs = tool_outputs.len(), "submitting tool outputs");
        let resp = self
            .post(
                &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
                &serde_json::json!({ "tool_outputs": tool_outputs, "stream": true }),
            )
            .await?;
        Ok(byte_stream(resp))
    }

    async fn file_content(&self, file_id: &str) -> Result<FileDownload> {
        let file_id = path_id("file", file_id)?;
        let url = format!("{}/files/{file_id}/content", self.base_url);
        let resp = shared_client()
            .get(&url)
            .headers(self.headers())
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(FileDownload {
            content_type,
            body: byte_stream(resp),
        })
    }
}

/// Upstream ids are interpolated into request paths, so only
/// identifier-shaped values (`[A-Za-z0-9_-]+`) are accepted.
fn path_id<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(id)
    } else {
        Err(PortalError::InvalidArgument(format!("invalid {kind} id: {id:?}")))
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_to_error(status.as_u16(), &body))
}

fn byte_stream(resp: reqwest::Response) -> ByteStream {
    Box::pin(resp.bytes_stream().map(|chunk| chunk.map_err(PortalError::from)))
}

#[derive(Deserialize)]
struct IdObject {
    id: String,
}
