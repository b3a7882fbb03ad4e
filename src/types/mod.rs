//! Core types for the relay and chat engine.

pub mod message;
pub mod run;
pub mod stream;

pub use message::{Message, Role};
pub use run::{FunctionCall, ToolCall, ToolOutput};
pub use stream::{Annotation, StreamEvent, ToolCallKind};
