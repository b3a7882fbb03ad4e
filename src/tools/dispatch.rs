//! Tool-call dispatch: lookup, argument parsing, failure capture.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::registry::ToolRegistry;
use crate::error::PortalError;
use crate::types::{ToolCall, ToolOutput};

pub const TOOL_ERROR_OUTPUT: &str = "An error occurred while processing your request.";

/// Output for a function no handler exists for.
pub fn not_implemented(name: &str) -> String {
    format!("Function \"{name}\" is not yet implemented.")
}

/// Runs tool calls against a registry. Never fails: every call yields a string.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one call and render its outcome.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, call_id = %call.id, "no handler registered for function");
            return not_implemented(name);
        };

        let result = match parse_arguments(&call.function.arguments) {
            Ok(args) => tool.call(args).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => {
                debug!(tool = name, call_id = %call.id, bytes = output.len(), "tool call finished");
                output
            }
            Err(e) => {
                warn!(tool = name, call_id = %call.id, error = %e, "tool call failed");
                TOOL_ERROR_OUTPUT.to_string()
            }
        }
    }

    /// Run every call concurrently; outputs keep their call ids and input order.
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        join_all(calls.iter().map(|call| async move {
            ToolOutput::new(call.id.clone(), self.dispatch(call).await)
        }))
        .await
    }
}

fn parse_arguments(arguments: &str) -> Result<serde_json::Value, PortalError> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(arguments)?)
}
