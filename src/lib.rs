//! Portal AI: streaming relay and chat engine for a genomics assistant.
//!
//! The [`server`] relays an Assistants API run stream to the browser. The
//! [`chat`] engine consumes that stream, rebuilds a role-tagged transcript,
//! and answers tool calls through the [`tools`] dispatcher before resuming
//! the run.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use portal_ai::prelude::*;
//!
//! # async fn example() -> portal_ai::error::Result<()> {
//! let relay = Arc::new(HttpRelayClient::new("http://127.0.0.1:3000"));
//! let tools = Dispatcher::new(ToolRegistry::portal("http://127.0.0.1:5005"));
//! let mut session = ChatSession::new(relay, Some(tools));
//! session.connect().await?;
//! session.send("What genes are associated with Type 2 Diabetes?").await?;
//! for message in session.messages() {
//!     println!("{}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assistants;
pub mod chat;
pub mod config;
pub mod error;
pub mod prelude;
pub mod server;
pub mod stream;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
