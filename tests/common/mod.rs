//! Shared test helpers: SSE builders and scripted relay/upstream fakes.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use portal_ai::assistants::{AssistantsApi, FileDownload};
use portal_ai::chat::RelayClient;
use portal_ai::error::{PortalError, Result};
use portal_ai::stream::ByteStream;
use portal_ai::types::ToolOutput;

/// One SSE frame as the Assistants API sends it.
pub fn sse(event: &str, data: Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

pub fn message_created() -> String {
    sse(
        "thread.message.created",
        json!({ "id": "msg_1", "object": "thread.message", "role": "assistant", "content": [] }),
    )
}

pub fn text_delta(value: &str) -> String {
    message_text_delta("msg_1", value)
}

pub fn message_text_delta(message_id: &str, value: &str) -> String {
    sse(
        "thread.message.delta",
        json!({
            "id": message_id,
            "object": "thread.message.delta",
            "delta": { "content": [{ "index": 0, "type": "text", "text": { "value": value } }] }
        }),
    )
}

pub fn code_delta(step_id: &str, index: u32, call_id: Option<&str>, input: &str) -> String {
    let mut call = json!({
        "index": index,
        "type": "code_interpreter",
        "code_interpreter": { "input": input, "outputs": [] }
    });
    if let Some(id) = call_id {
        call["id"] = json!(id);
    }
    sse(
        "thread.run.step.delta",
        json!({
            "id": step_id,
            "object": "thread.run.step.delta",
            "delta": { "step_details": { "type": "tool_calls", "tool_calls": [call] } }
        }),
    )
}

pub fn requires_action(run_id: &str, calls: &[(&str, &str, &str)]) -> String {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({ "id": id, "type": "function", "function": { "name": name, "arguments": args } })
        })
        .collect();
    sse(
        "thread.run.requires_action",
        json!({
            "id": run_id,
            "object": "thread.run",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": { "tool_calls": tool_calls }
            }
        }),
    )
}

pub fn run_created(run_id: &str) -> String {
    sse("thread.run.created", json!({ "id": run_id, "object": "thread.run", "status": "queued" }))
}

pub fn run_completed(run_id: &str) -> String {
    sse("thread.run.completed", json!({ "id": run_id, "object": "thread.run", "status": "completed" }))
}

pub fn done() -> String {
    "event: done\ndata: [DONE]\n\n".to_string()
}

/// Split a body into fixed-size byte chunks.
pub fn chunked(body: &str, size: usize) -> Vec<Bytes> {
    body.as_bytes()
        .chunks(size.max(1))
        .map(Bytes::copy_from_slice)
        .collect()
}

pub fn byte_stream(chunks: Vec<Bytes>) -> ByteStream {
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}

/// A scripted reply to one relay call.
pub enum Script {
    Stream(Vec<Bytes>),
    /// Stream the chunks, then fail mid-stream.
    Broken(Vec<Bytes>),
    Fail(u16),
}

impl Script {
    pub fn body(body: String) -> Self {
        Self::Stream(chunked(&body, 64))
    }

    fn into_stream(self) -> Result<ByteStream> {
        match self {
            Self::Stream(chunks) => Ok(byte_stream(chunks)),
            Self::Broken(chunks) => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(PortalError::Stream("connection reset".into()))));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Self::Fail(status) => Err(PortalError::api(status, "scripted failure")),
        }
    }
}

/// Relay call as recorded by [`ScriptedRelay`].
#[derive(Debug, Clone, PartialEq)]
pub enum RelayCall {
    CreateThread,
    StartRun { thread_id: String, content: String },
    ResumeRun { thread_id: String, run_id: String, outputs: Vec<ToolOutput> },
}

/// Relay fake replaying queued scripts in call order.
#[derive(Clone, Default)]
pub struct ScriptedRelay {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    calls: Arc<Mutex<Vec<RelayCall>>>,
    fail_thread: bool,
}

impl ScriptedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_thread_creation() -> Self {
        Self {
            fail_thread: true,
            ..Self::default()
        }
    }

    pub fn queue(&self, script: Script) -> &Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resume_calls(&self) -> Vec<RelayCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, RelayCall::ResumeRun { .. }))
            .collect()
    }

    fn next_script(&self) -> Result<ByteStream> {
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortalError::InvalidState("no scripted stream left".into()))?
            .into_stream()
    }
}

#[async_trait]
impl RelayClient for ScriptedRelay {
    async fn create_thread(&self) -> Result<String> {
        self.calls.lock().unwrap().push(RelayCall::CreateThread);
        if self.fail_thread {
            return Err(PortalError::api(500, "thread creation failed"));
        }
        Ok("thread_1".to_string())
    }

    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream> {
        self.calls.lock().unwrap().push(RelayCall::StartRun {
            thread_id: thread_id.to_string(),
            content: content.to_string(),
        });
        self.next_script()
    }

    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream> {
        self.calls.lock().unwrap().push(RelayCall::ResumeRun {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
            outputs: tool_outputs.to_vec(),
        });
        self.next_script()
    }
}

/// Upstream fake for router tests.
#[derive(Clone, Default)]
pub struct FakeAssistants {
    pub run_body: String,
    pub resume_body: String,
    pub fail_status: Option<u16>,
    pub calls: Arc<Mutex<Vec<RelayCall>>>,
}

impl FakeAssistants {
    fn check(&self) -> Result<()> {
        match self.fail_status {
            Some(401) => Err(PortalError::Authentication("bad key".into())),
            Some(status) => Err(PortalError::api(status, "upstream said no")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AssistantsApi for FakeAssistants {
    async fn create_thread(&self) -> Result<String> {
        self.check()?;
        self.calls.lock().unwrap().push(RelayCall::CreateThread);
        Ok("thread_abc".to_string())
    }

    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream> {
        self.check()?;
        self.calls.lock().unwrap().push(RelayCall::StartRun {
            thread_id: thread_id.to_string(),
            content: content.to_string(),
        });
        Ok(byte_stream(chunked(&self.run_body, 7)))
    }

    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream> {
        self.check()?;
        self.calls.lock().unwrap().push(RelayCall::ResumeRun {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
            outputs: tool_outputs.to_vec(),
        });
        Ok(byte_stream(chunked(&self.resume_body, 7)))
    }

    async fn file_content(&self, file_id: &str) -> Result<FileDownload> {
        self.check()?;
        Ok(FileDownload {
            content_type: Some("text/csv".to_string()),
            body: byte_stream(vec![Bytes::from(format!("id,file\n1,{file_id}\n"))]),
        })
    }
}
