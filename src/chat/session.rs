//! Stream reconstruction state machine.
//!
//! A [`ChatSession`] owns one thread's transcript. Each user message opens a
//! streaming phase; a requires-action event pauses it, dispatches every
//! pending tool call concurrently, submits the whole output batch and
//! attaches a nested phase to the continuation stream. Input stays disabled
//! from submission until a run-completed event arrives on that chain.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use strum::Display;
use tracing::{debug, info, warn};

use super::relay::RelayClient;
use super::transcript::Transcript;
use crate::error::{PortalError, Result};
use crate::stream::{event_stream, ByteStream};
use crate::tools::dispatch::not_implemented;
use crate::tools::Dispatcher;
use crate::types::{Message, Role, StreamEvent, ToolCall, ToolCallKind, ToolOutput};

pub const ASSISTANT_ERROR_MESSAGE: &str = "⚠️ Assistant encountered an error.";
pub const THINKING_STATUS: &str = "Thinking";

/// Where the session is in its run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChatPhase {
    Idle,
    AwaitingThread,
    Streaming,
    AwaitingToolOutputs,
}

/// A change to the session's visible state, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    Phase(ChatPhase),
    MessageAppended { index: usize, role: Role },
    TextAppended { index: usize, text: String },
    MessageRewritten { index: usize },
    Status(Option<String>),
    InputEnabled(bool),
}

/// Receives every [`ChatUpdate`].
pub type UpdateSink = Arc<dyn Fn(&ChatUpdate) + Send + Sync>;

/// How one user submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run reached run-completed.
    Completed,
    /// The run failed; the transcript carries the error entry.
    Failed(String),
    /// Blank input; nothing was sent.
    Skipped,
}

/// How one streaming phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PhaseOutcome {
    Completed,
    Failed(String),
    /// The stream closed without completing.
    Ended,
}

pub struct ChatSession {
    relay: Arc<dyn RelayClient>,
    dispatcher: Option<Dispatcher>,
    sink: Option<UpdateSink>,
    thread_id: Option<String>,
    transcript: Transcript,
    phase: ChatPhase,
    status: Option<String>,
    input_enabled: bool,
}

impl ChatSession {
    /// Create a session. Without a dispatcher every tool call is answered
    /// with the not-implemented output.
    pub fn new(relay: Arc<dyn RelayClient>, dispatcher: Option<Dispatcher>) -> Self {
        Self {
            relay,
            dispatcher,
            sink: None,
            thread_id: None,
            transcript: Transcript::new(),
            phase: ChatPhase::Idle,
            status: None,
            input_enabled: true,
        }
    }

    pub fn with_sink(mut self, sink: UpdateSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Create the session's thread. Called once; later calls return the
    /// existing id.
    pub async fn connect(&mut self) -> Result<&str> {
        if self.thread_id.is_none() {
            self.set_phase(ChatPhase::AwaitingThread);
            let created = self.relay.create_thread().await;
            self.set_phase(ChatPhase::Idle);
            let thread_id = created?;
            info!(%thread_id, "chat thread ready");
            self.thread_id = Some(thread_id);
        }
        self.thread_id
            .as_deref()
            .ok_or_else(|| PortalError::InvalidState("thread id missing after connect".into()))
    }

    /// Submit a user message and drive the run to its end.
    ///
    /// Relay and stream failures do not surface as `Err`; they end the run
    /// with an error entry in the transcript. `Err` means the session could
    /// not accept input at all.
    pub async fn send(&mut self, text: &str) -> Result<RunOutcome> {
        if text.trim().is_empty() {
            return Ok(RunOutcome::Skipped);
        }
        if !self.input_enabled {
            return Err(PortalError::InvalidState(
                "a run is already in progress".into(),
            ));
        }

        let index = self.transcript.push(Role::User, text);
        self.emit(ChatUpdate::MessageAppended {
            index,
            role: Role::User,
        });
        self.set_input_enabled(false);
        self.set_status(Some(THINKING_STATUS.to_string()));

        let outcome = match self.connect().await.map(str::to_string) {
            Ok(thread_id) => {
                match self.relay.start_run(&thread_id, text).await {
                    Ok(bytes) => self.run_phase(bytes).await,
                    Err(e) => PhaseOutcome::Failed(e.to_string()),
                }
            }
            Err(e) => PhaseOutcome::Failed(e.to_string()),
        };

        Ok(self.finish_run(outcome))
    }

    fn finish_run(&mut self, outcome: PhaseOutcome) -> RunOutcome {
        self.set_status(None);
        let outcome = match outcome {
            PhaseOutcome::Completed => RunOutcome::Completed,
            PhaseOutcome::Failed(reason) => RunOutcome::Failed(reason),
            PhaseOutcome::Ended => {
                RunOutcome::Failed("run stream ended before the run completed".into())
            }
        };

        if let RunOutcome::Failed(ref reason) = outcome {
            warn!(reason = %reason, "assistant run failed");
            let index = self.transcript.push(Role::Assistant, ASSISTANT_ERROR_MESSAGE);
            self.emit(ChatUpdate::MessageAppended {
                index,
                role: Role::Assistant,
            });
            self.set_input_enabled(true);
        }
        self.set_phase(ChatPhase::Idle);
        outcome
    }

    /// Consume one relayed stream. Boxed because a tool round trip attaches
    /// a nested phase from inside the event loop.
    fn run_phase(&mut self, bytes: ByteStream) -> BoxFuture<'_, PhaseOutcome> {
        Box::pin(async move {
            self.set_phase(ChatPhase::Streaming);
            let mut events = event_stream(bytes);
            let mut outcome = PhaseOutcome::Ended;

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "run stream broke off");
                        if outcome == PhaseOutcome::Ended {
                            outcome = PhaseOutcome::Failed(e.to_string());
                        }
                        break;
                    }
                };
                debug!(event = event.name(), "stream event");
                if let Some(result) = self.apply(event).await {
                    outcome = result;
                }
            }
            outcome
        })
    }

    /// Apply one event; returns the phase outcome when the event decides it.
    async fn apply(&mut self, event: StreamEvent) -> Option<PhaseOutcome> {
        match event {
            StreamEvent::TextCreated => {
                let index = self.transcript.push(Role::Assistant, "");
                self.emit(ChatUpdate::MessageAppended {
                    index,
                    role: Role::Assistant,
                });
                None
            }
            StreamEvent::TextDelta { value, annotations } => {
                if let Some(text) = value {
                    self.append_text(&text);
                }
                if !annotations.is_empty() {
                    if let Some(index) = self.transcript.annotate(&annotations) {
                        self.emit(ChatUpdate::MessageRewritten { index });
                    }
                }
                None
            }
            StreamEvent::ToolCallCreated { id, kind } => {
                if kind == ToolCallKind::CodeInterpreter {
                    let index = self.transcript.push(Role::Code, "");
                    self.emit(ChatUpdate::MessageAppended {
                        index,
                        role: Role::Code,
                    });
                } else {
                    debug!(call_id = %id, %kind, "tool call without transcript entry");
                }
                None
            }
            StreamEvent::ToolCallDelta { kind, input, .. } => {
                if kind == ToolCallKind::CodeInterpreter {
                    if let Some(input) = input.filter(|i| !i.is_empty()) {
                        self.append_text(&input);
                    }
                }
                None
            }
            StreamEvent::RequiresAction { run_id, tool_calls } => {
                Some(self.submit_tool_outputs(run_id, tool_calls).await)
            }
            StreamEvent::RunCompleted { run_id } => {
                info!(%run_id, "run completed");
                self.set_input_enabled(true);
                self.set_phase(ChatPhase::Idle);
                Some(PhaseOutcome::Completed)
            }
            StreamEvent::RunFailed { run_id, message } => {
                warn!(run_id = ?run_id, %message, "run failed upstream");
                Some(PhaseOutcome::Failed(message))
            }
            StreamEvent::Other { .. } => None,
        }
    }

    async fn submit_tool_outputs(&mut self, run_id: String, tool_calls: Vec<ToolCall>) -> PhaseOutcome {
        self.set_phase(ChatPhase::AwaitingToolOutputs);
        if let Some(first) = tool_calls.first() {
            let status = if first.function.name.is_empty() {
                "🔧 Calling function".to_string()
            } else {
                format!("🔧 Calling function `{}`", first.function.name)
            };
            self.set_status(Some(status));
        }

        info!(%run_id, calls = tool_calls.len(), "dispatching tool calls");
        let outputs = match self.dispatcher.as_ref() {
            Some(dispatcher) => dispatcher.dispatch_all(&tool_calls).await,
            None => tool_calls
                .iter()
                .map(|call| ToolOutput::new(call.id.clone(), not_implemented(&call.function.name)))
                .collect(),
        };

        self.set_input_enabled(false);
        let Some(thread_id) = self.thread_id.clone() else {
            return PhaseOutcome::Failed("no thread for tool outputs".into());
        };

        let outcome = match self.relay.resume_run(&thread_id, &run_id, &outputs).await {
            Ok(bytes) => self.run_phase(bytes).await,
            Err(e) => PhaseOutcome::Failed(e.to_string()),
        };
        self.set_status(None);
        outcome
    }

    fn append_text(&mut self, text: &str) {
        let opened = self.transcript.open_message().is_none();
        let index = self.transcript.append(text);
        if opened {
            self.emit(ChatUpdate::MessageAppended {
                index,
                role: Role::Assistant,
            });
        }
        self.emit(ChatUpdate::TextAppended {
            index,
            text: text.to_string(),
        });
    }

    fn set_phase(&mut self, phase: ChatPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "chat phase");
            self.phase = phase;
            self.emit(ChatUpdate::Phase(phase));
        }
    }

    fn set_status(&mut self, status: Option<String>) {
        if self.status != status {
            self.status = status.clone();
            self.emit(ChatUpdate::Status(status));
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if self.input_enabled != enabled {
            self.input_enabled = enabled;
            self.emit(ChatUpdate::InputEnabled(enabled));
        }
    }

    fn emit(&self, update: ChatUpdate) {
        if let Some(ref sink) = self.sink {
            sink(&update);
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("thread_id", &self.thread_id)
            .field("phase", &self.phase)
            .field("status", &self.status)
            .field("input_enabled", &self.input_enabled)
            .field("messages", &self.transcript.len())
            .finish()
    }
}
