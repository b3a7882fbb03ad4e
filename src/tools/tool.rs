//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PortalError;

/// A named handler the assistant can call.
///
/// Handlers receive the parsed arguments object and return the display
/// string submitted back upstream as the tool output.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match the function name configured on the assistant).
    fn name(&self) -> &str;

    async fn call(&self, args: serde_json::Value) -> Result<String, PortalError>;
}

type ToolHandler = dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<String, PortalError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick registration.
pub struct FnTool {
    name: String,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, PortalError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, PortalError> {
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}
