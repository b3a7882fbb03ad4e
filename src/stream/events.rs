//! Mapping of Assistants API stream frames onto [`StreamEvent`]s.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use super::sse::{FrameDecoder, SseFrame};
use crate::error::PortalError;
use crate::types::{Annotation, StreamEvent, ToolCall, ToolCallKind};

/// Turns SSE frames into typed events.
///
/// Tool calls inside run-step deltas are identified by `(step id, index)`:
/// only the first delta for a call carries its id, so the decoder remembers
/// which calls it has already announced. Text parts are tracked the same
/// way by `(message id, index)`; the first delta of a part announces it.
#[derive(Debug, Default)]
pub struct EventDecoder {
    tool_calls: HashMap<(String, u32), (String, ToolCallKind)>,
    text_parts: HashSet<(String, u32)>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame. Unparseable payloads yield no events.
    pub fn decode(&mut self, frame: &SseFrame) -> Vec<StreamEvent> {
        let Some(event) = frame.event.as_deref() else {
            return Vec::new();
        };
        if frame.data == "[DONE]" {
            return vec![StreamEvent::Other {
                event: event.to_string(),
            }];
        }

        match self.decode_payload(event, &frame.data) {
            Ok(events) => events,
            Err(e) => {
                debug!(event, error = %e, "skipping unparseable stream frame");
                Vec::new()
            }
        }
    }

    fn decode_payload(&mut self, event: &str, data: &str) -> serde_json::Result<Vec<StreamEvent>> {
        let events = match event {
            "thread.message.delta" => {
                let payload: MessageDeltaEvent = serde_json::from_str(data)?;
                let mut events = Vec::new();
                for part in payload.delta.content {
                    if part.kind != "text" {
                        continue;
                    }
                    let Some(text) = part.text else { continue };
                    if self.text_parts.insert((payload.id.clone(), part.index)) {
                        events.push(StreamEvent::TextCreated);
                    }
                    events.push(StreamEvent::TextDelta {
                        value: text.value,
                        annotations: text.annotations.iter().map(parse_annotation).collect(),
                    });
                }
                events
            }
            "thread.run.step.delta" => {
                let payload: RunStepDeltaEvent = serde_json::from_str(data)?;
                self.decode_step_delta(payload)
            }
            "thread.run.requires_action" => {
                let run: RunObject = serde_json::from_str(data)?;
                let tool_calls = run
                    .required_action
                    .map(|action| action.submit_tool_outputs.tool_calls)
                    .unwrap_or_default();
                vec![StreamEvent::RequiresAction {
                    run_id: run.id,
                    tool_calls,
                }]
            }
            "thread.run.completed" => {
                let run: RunObject = serde_json::from_str(data)?;
                vec![StreamEvent::RunCompleted { run_id: run.id }]
            }
            "thread.run.failed" | "thread.run.cancelled" | "thread.run.expired" => {
                let run: RunObject = serde_json::from_str(data)?;
                let message = run
                    .last_error
                    .map(|e| e.message)
                    .unwrap_or_else(|| event.trim_start_matches("thread.run.").to_string());
                vec![StreamEvent::RunFailed {
                    run_id: Some(run.id),
                    message,
                }]
            }
            "error" => {
                let payload: ErrorEvent = serde_json::from_str(data)?;
                let message = payload
                    .error
                    .map(|e| e.message)
                    .or(payload.message)
                    .unwrap_or_else(|| "stream error".to_string());
                vec![StreamEvent::RunFailed {
                    run_id: None,
                    message,
                }]
            }
            other => vec![StreamEvent::Other {
                event: other.to_string(),
            }],
        };
        Ok(events)
    }

    fn decode_step_delta(&mut self, payload: RunStepDeltaEvent) -> Vec<StreamEvent> {
        let Some(details) = payload.delta.step_details else {
            return Vec::new();
        };
        if details.kind != "tool_calls" {
            return Vec::new();
        }

        let mut events = Vec::new();
        for call in details.tool_calls {
            let key = (payload.id.clone(), call.index);
            let (id, kind) = match self.tool_calls.get(&key) {
                Some(known) => known.clone(),
                None => {
                    let id = call.id.clone().unwrap_or_else(|| format!("{}:{}", key.0, key.1));
                    let kind = call
                        .kind
                        .as_deref()
                        .map(ToolCallKind::from_wire)
                        .unwrap_or(ToolCallKind::Other);
                    self.tool_calls.insert(key, (id.clone(), kind));
                    events.push(StreamEvent::ToolCallCreated {
                        id: id.clone(),
                        kind,
                    });
                    (id, kind)
                }
            };

            let input = call.code_interpreter.and_then(|ci| ci.input);
            if kind == ToolCallKind::CodeInterpreter && input.as_deref().is_some_and(|i| !i.is_empty()) {
                events.push(StreamEvent::ToolCallDelta { id, kind, input });
            }
        }
        events
    }
}

fn parse_annotation(raw: &serde_json::Value) -> Annotation {
    let is_file_path = raw.get("type").and_then(|t| t.as_str()) == Some("file_path");
    let text = raw.get("text").and_then(|t| t.as_str());
    let file_id = raw
        .get("file_path")
        .and_then(|f| f.get("file_id"))
        .and_then(|id| id.as_str());
    match (is_file_path, text, file_id) {
        (true, Some(text), Some(file_id)) => Annotation::FilePath {
            text: text.to_string(),
            file_id: file_id.to_string(),
        },
        _ => Annotation::Other,
    }
}

/// Decode a relayed byte stream into events.
///
/// A transport error is yielded once and ends the stream.
pub fn event_stream<S>(bytes: S) -> BoxStream<'static, Result<StreamEvent, PortalError>>
where
    S: Stream<Item = Result<Bytes, PortalError>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut frames = FrameDecoder::new();
        let mut events = EventDecoder::new();
        let mut failed = false;
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    failed = true;
                    break;
                }
            };
            for frame in frames.feed(&chunk) {
                for event in events.decode(&frame) {
                    yield Ok(event);
                }
            }
        }

        if !failed {
            if let Some(frame) = frames.finish() {
                for event in events.decode(&frame) {
                    yield Ok(event);
                }
            }
        }
    };
    Box::pin(stream)
}

// Assistants API stream payloads (internal)

#[derive(Deserialize)]
struct MessageDeltaEvent {
    id: String,
    delta: MessageDelta,
}

#[derive(Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<MessageContentDelta>,
}

#[derive(Deserialize)]
struct MessageContentDelta {
    #[serde(default)]
    index: u32,
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextDelta>,
}

#[derive(Deserialize)]
struct TextDelta {
    value: Option<String>,
    #[serde(default)]
    annotations: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RunStepDeltaEvent {
    id: String,
    delta: RunStepDelta,
}

#[derive(Deserialize)]
struct RunStepDelta {
    step_details: Option<StepDetailsDelta>,
}

#[derive(Deserialize)]
struct StepDetailsDelta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    tool_calls: Vec<ToolCallDeltaPayload>,
}

#[derive(Deserialize)]
struct ToolCallDeltaPayload {
    index: u32,
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code_interpreter: Option<CodeInterpreterDelta>,
}

#[derive(Deserialize)]
struct CodeInterpreterDelta {
    input: Option<String>,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    required_action: Option<RequiredAction>,
    last_error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ErrorEvent {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(event: &str, data: serde_json::Value) -> SseFrame {
        SseFrame {
            event: Some(event.to_string()),
            data: data.to_string(),
        }
    }

    #[test]
    fn message_delta_yields_text_and_file_annotations() {
        let mut decoder = EventDecoder::new();
        let events = decoder.decode(&frame(
            "thread.message.delta",
            json!({
                "id": "msg_1",
                "delta": { "content": [{
                    "index": 0,
                    "type": "text",
                    "text": {
                        "value": "see sandbox:/mnt/data/plot.png",
                        "annotations": [
                            { "type": "file_path", "text": "sandbox:/mnt/data/plot.png",
                              "file_path": { "file_id": "file-9" } },
                            { "type": "file_citation", "text": "[1]" }
                        ]
                    }
                }]}
            }),
        ));

        assert_eq!(
            events,
            vec![StreamEvent::TextCreated, StreamEvent::TextDelta {
                value: Some("see sandbox:/mnt/data/plot.png".into()),
                annotations: vec![
                    Annotation::FilePath {
                        text: "sandbox:/mnt/data/plot.png".into(),
                        file_id: "file-9".into(),
                    },
                    Annotation::Other,
                ],
            }]
        );
    }

    #[test]
    fn text_part_is_announced_on_its_first_delta_only() {
        let delta = |id: &str, index: u32, kind: &str, value: &str| {
            let part = if kind == "text" {
                json!({ "index": index, "type": "text", "text": { "value": value } })
            } else {
                json!({ "index": index, "type": kind, "image_file": { "file_id": "file-img" } })
            };
            frame(
                "thread.message.delta",
                json!({ "id": id, "delta": { "content": [part] } }),
            )
        };
        let text = |value: &str| StreamEvent::TextDelta {
            value: Some(value.into()),
            annotations: vec![],
        };

        let mut decoder = EventDecoder::new();
        let created = frame(
            "thread.message.created",
            json!({ "id": "msg_1", "role": "assistant", "content": [] }),
        );
        assert_eq!(
            decoder.decode(&created),
            vec![StreamEvent::Other { event: "thread.message.created".into() }]
        );
        assert!(decoder.decode(&delta("msg_1", 0, "image_file", "")).is_empty());
        assert_eq!(
            decoder.decode(&delta("msg_1", 1, "text", "Hel")),
            vec![StreamEvent::TextCreated, text("Hel")]
        );
        assert_eq!(decoder.decode(&delta("msg_1", 1, "text", "lo")), vec![text("lo")]);
        assert_eq!(
            decoder.decode(&delta("msg_2", 0, "text", "Next")),
            vec![StreamEvent::TextCreated, text("Next")]
        );
    }

    #[test]
    fn step_delta_announces_each_tool_call_once() {
        let mut decoder = EventDecoder::new();
        let first = decoder.decode(&frame(
            "thread.run.step.delta",
            json!({
                "id": "step_1",
                "delta": { "step_details": { "type": "tool_calls", "tool_calls": [
                    { "index": 0, "id": "call_1", "type": "code_interpreter",
                      "code_interpreter": { "input": "import pandas" } }
                ]}}
            }),
        ));
        let second = decoder.decode(&frame(
            "thread.run.step.delta",
            json!({
                "id": "step_1",
                "delta": { "step_details": { "type": "tool_calls", "tool_calls": [
                    { "index": 0, "type": "code_interpreter",
                      "code_interpreter": { "input": " as pd" } }
                ]}}
            }),
        ));

        assert_eq!(
            first,
            vec![
                StreamEvent::ToolCallCreated {
                    id: "call_1".into(),
                    kind: ToolCallKind::CodeInterpreter,
                },
                StreamEvent::ToolCallDelta {
                    id: "call_1".into(),
                    kind: ToolCallKind::CodeInterpreter,
                    input: Some("import pandas".into()),
                },
            ]
        );
        assert_eq!(
            second,
            vec![StreamEvent::ToolCallDelta {
                id: "call_1".into(),
                kind: ToolCallKind::CodeInterpreter,
                input: Some(" as pd".into()),
            }]
        );
    }

    #[test]
    fn requires_action_extracts_run_and_calls() {
        let mut decoder = EventDecoder::new();
        let events = decoder.decode(&frame(
            "thread.run.requires_action",
            json!({
                "id": "run_7",
                "status": "requires_action",
                "required_action": {
                    "type": "submit_tool_outputs",
                    "submit_tool_outputs": { "tool_calls": [
                        { "id": "call_a", "type": "function",
                          "function": { "name": "get_top_genes", "arguments": "{\"phenotype_id\":\"T2D\"}" } }
                    ]}
                }
            }),
        ));

        assert_eq!(
            events,
            vec![StreamEvent::RequiresAction {
                run_id: "run_7".into(),
                tool_calls: vec![ToolCall::new(
                    "call_a",
                    "get_top_genes",
                    "{\"phenotype_id\":\"T2D\"}"
                )],
            }]
        );
    }

    #[test]
    fn failed_run_carries_last_error() {
        let mut decoder = EventDecoder::new();
        let events = decoder.decode(&frame(
            "thread.run.failed",
            json!({ "id": "run_2", "last_error": { "code": "server_error", "message": "boom" } }),
        ));
        assert_eq!(
            events,
            vec![StreamEvent::RunFailed {
                run_id: Some("run_2".into()),
                message: "boom".into(),
            }]
        );
    }

    #[test]
    fn malformed_payload_is_skipped() {
        let mut decoder = EventDecoder::new();
        let events = decoder.decode(&SseFrame {
            event: Some("thread.run.completed".into()),
            data: "{not json".into(),
        });
        assert!(events.is_empty());
    }

    #[test]
    fn unknown_events_pass_through_as_other() {
        let mut decoder = EventDecoder::new();
        let events = decoder.decode(&frame("thread.run.queued", json!({ "id": "run_1" })));
        assert_eq!(
            events,
            vec![StreamEvent::Other {
                event: "thread.run.queued".into()
            }]
        );
    }
}
