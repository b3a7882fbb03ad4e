//! Upstream Assistants API access.
//!
//! The relay needs four upstream operations; [`AssistantsApi`] is the
//! seam the server is written against so tests can substitute a scripted
//! upstream.

pub mod openai;

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::ByteStream;
use crate::types::ToolOutput;

pub use openai::OpenAiAssistants;

/// A file produced by a run, streamed back as-is.
pub struct FileDownload {
    pub content_type: Option<String>,
    pub body: ByteStream,
}

/// Operations the relay performs against the upstream assistant service.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Create an empty thread and return its id.
    async fn create_thread(&self) -> Result<String>;

    /// Append a user message to the thread and open a streamed run.
    async fn start_run(&self, thread_id: &str, content: &str) -> Result<ByteStream>;

    /// Submit the outputs for a run that requires action and stream the continuation.
    async fn resume_run(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<ByteStream>;

    /// Fetch the content of a file produced by a run.
    async fn file_content(&self, file_id: &str) -> Result<FileDownload>;
}
