//! Tool registry and dispatcher for assistant function calls.

pub mod dispatch;
pub mod format;
pub mod portal;
pub mod registry;
pub mod tool;

pub use dispatch::Dispatcher;
pub use portal::PortalTool;
pub use registry::ToolRegistry;
pub use tool::{FnTool, Tool};
