//! Typed events rebuilt from the relayed run stream.

use serde::{Deserialize, Serialize};
use strum::Display;

use super::run::ToolCall;

/// One discrete event of an assistant run stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A new assistant text message begins.
    TextCreated,
    /// A fragment of assistant text, possibly with annotations.
    TextDelta {
        value: Option<String>,
        #[serde(default)]
        annotations: Vec<Annotation>,
    },
    /// The run started a tool call (code interpreter, file search, function).
    ToolCallCreated { id: String, kind: ToolCallKind },
    /// A fragment of a tool call's input. Only code input is carried.
    ToolCallDelta {
        id: String,
        kind: ToolCallKind,
        input: Option<String>,
    },
    /// The run is blocked until outputs for every call are submitted.
    RequiresAction {
        run_id: String,
        tool_calls: Vec<ToolCall>,
    },
    RunCompleted { run_id: String },
    /// The run failed, was cancelled or expired, or upstream sent an error.
    RunFailed {
        run_id: Option<String>,
        message: String,
    },
    /// Any event the chat engine does not act on.
    Other { event: String },
}

impl StreamEvent {
    /// Short name for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::TextCreated => "text_created",
            Self::TextDelta { .. } => "text_delta",
            Self::ToolCallCreated { .. } => "tool_call_created",
            Self::ToolCallDelta { .. } => "tool_call_delta",
            Self::RequiresAction { .. } => "requires_action",
            Self::RunCompleted { .. } => "run_completed",
            Self::RunFailed { .. } => "run_failed",
            Self::Other { event } => event,
        }
    }
}

/// Tool-call subtype reported inside run steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolCallKind {
    CodeInterpreter,
    FileSearch,
    Function,
    Other,
}

impl ToolCallKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "code_interpreter" => Self::CodeInterpreter,
            "file_search" => Self::FileSearch,
            "function" => Self::Function,
            _ => Self::Other,
        }
    }
}

/// Annotation attached to a text delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// `text` in the message refers to a file produced by the run.
    FilePath { text: String, file_id: String },
    /// Citations and other annotations the transcript leaves alone.
    Other,
}
