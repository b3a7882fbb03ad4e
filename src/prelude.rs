//! Convenience re-exports for common use.

pub use crate::assistants::{AssistantsApi, OpenAiAssistants};
pub use crate::chat::{ChatSession, ChatUpdate, HttpRelayClient, RelayClient, RunOutcome};
pub use crate::config::PortalConfig;
pub use crate::error::{PortalError, Result};
pub use crate::tools::{Dispatcher, FnTool, Tool, ToolRegistry};
pub use crate::types::{Message, Role, StreamEvent, ToolCall, ToolOutput};
