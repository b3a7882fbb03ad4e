//! Client side of the run relay.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::assistants::AssistantsApi;
use crate::error::{PortalError, Result};
use crate::server::routes::{CreateThreadResponse, PostMessageRequest, SubmitActionsRequest};
use crate::stream::ByteStream;
use crate::types::ToolOutput;
use crate::util::http::{shared_client, status_to_error};

/// The three relay operations the chat engine drives.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn create_thread(&self) -> Result<String>;

    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream>;

    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream>;
}

/// Talks to a relay server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    base_url: String,
}

impl HttpRelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "relay request");
        let resp = shared_client().post(&url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body));
        }
        Ok(resp)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn create_thread(&self) -> Result<String> {
        let resp = self.post("/threads", &serde_json::json!({})).await?;
        let created: CreateThreadResponse = resp.json().await?;
        Ok(created.thread_id)
    }

    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream> {
        let request = PostMessageRequest {
            content: content.to_string(),
        };
        let resp = self
            .post(&format!("/threads/{thread_id}/messages"), &request)
            .await?;
        Ok(body_stream(resp))
    }

    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream> {
        let request = SubmitActionsRequest {
            run_id: run_id.to_string(),
            tool_call_outputs: tool_outputs.to_vec(),
        };
        let resp = self
            .post(&format!("/threads/{thread_id}/actions"), &request)
            .await?;
        Ok(body_stream(resp))
    }
}

fn body_stream(resp: reqwest::Response) -> ByteStream {
    Box::pin(resp.bytes_stream().map(|chunk| chunk.map_err(PortalError::from)))
}

/// Drives the upstream service in-process, without a relay server.
#[derive(Clone)]
pub struct DirectRelay {
    assistants: Arc<dyn AssistantsApi>,
}

impl DirectRelay {
    pub fn new(assistants: Arc<dyn AssistantsApi>) -> Self {
        Self { assistants }
    }
}

#[async_trait]
impl RelayClient for DirectRelay {
    async fn create_thread(&self) -> Result<String> {
        self.assistants.create_thread().await
    }

    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream> {
        self.assistants.start_run(thread_id, content).await
    }

    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream> {
        self.assistants
            .resume_run(thread_id, run_id, tool_outputs)
            .await
    }
}
