//! Terminal front-end for a chat session.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::warn;

use super::ChatArgs;
use crate::assistants::OpenAiAssistants;
use crate::chat::{ChatSession, ChatUpdate, DirectRelay, HttpRelayClient, RelayClient, RunOutcome};
use crate::config::PortalConfig;
use crate::error::Result;
use crate::tools::{Dispatcher, ToolRegistry};
use crate::types::Role;

/// Run the chat client until stdin closes (or once, with a prompt).
pub async fn run(config: &PortalConfig, args: ChatArgs) -> Result<()> {
    let relay: Arc<dyn RelayClient> = if args.direct {
        Arc::new(DirectRelay::new(Arc::new(OpenAiAssistants::from_config(config)?)))
    } else {
        let server = args.server.as_deref().unwrap_or(&config.server_url);
        Arc::new(HttpRelayClient::new(server))
    };

    let dispatcher = match config.tools_base_url.as_deref() {
        Some(base_url) => Some(Dispatcher::new(ToolRegistry::portal(base_url))),
        None => {
            warn!("PORTAL_API_BASE_URL not set; tool calls will not be answered");
            None
        }
    };

    let mut session = ChatSession::new(relay, dispatcher).with_sink(Arc::new(render));
    session.connect().await?;

    if let Some(prompt) = args.prompt {
        send(&mut session, &prompt).await?;
        return Ok(());
    }

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    prompt_marker();
    while let Some(line) = lines.next().await {
        let line = line?;
        send(&mut session, &line).await?;
        prompt_marker();
    }
    Ok(())
}

async fn send(session: &mut ChatSession, text: &str) -> Result<()> {
    if let RunOutcome::Failed(reason) = session.send(text).await? {
        eprintln!("({reason})");
    }
    Ok(())
}

fn render(update: &ChatUpdate) {
    match update {
        ChatUpdate::MessageAppended { role: Role::Assistant, .. } => println!(),
        ChatUpdate::MessageAppended { role: Role::Code, .. } => println!("\n[code]"),
        ChatUpdate::MessageAppended { role: Role::User, .. } => {}
        ChatUpdate::TextAppended { text, .. } => print!("{text}"),
        ChatUpdate::Status(Some(status)) => eprintln!("\n{status}..."),
        ChatUpdate::InputEnabled(true) => println!(),
        _ => {}
    }
    let _ = std::io::stdout().flush();
}

fn prompt_marker() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
