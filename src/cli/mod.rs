//! Command-line entry points.

pub mod chat;

use clap::{Parser, Subcommand};

/// Portal assistant relay and terminal chat client
#[derive(Parser, Debug)]
#[command(name = "portal-ai", version, about = "Portal assistant relay and chat client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay server
    Serve(ServeArgs),
    /// Chat with the assistant through a relay
    Chat(ChatArgs),
}

/// Arguments for `portal-ai serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides PORTAL_BIND_ADDR)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Arguments for `portal-ai chat`.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Relay server URL (overrides PORTAL_SERVER_URL)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Talk to the upstream service directly instead of through a relay
    #[arg(long, conflicts_with = "server")]
    pub direct: bool,

    /// Send one prompt and exit; without it, read prompts from stdin
    pub prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["portal-ai", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8080")),
            other => panic!("expected Serve, got {other:?}"),
        }
    }

    #[test]
    fn parse_chat_prompt() {
        let cli = Cli::try_parse_from([
            "portal-ai",
            "chat",
            "--server",
            "http://relay.test",
            "What genes are associated with Type 2 Diabetes?",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.server.as_deref(), Some("http://relay.test"));
                assert!(!args.direct);
                assert_eq!(
                    args.prompt.as_deref(),
                    Some("What genes are associated with Type 2 Diabetes?")
                );
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn direct_conflicts_with_server() {
        let result = Cli::try_parse_from(["portal-ai", "chat", "--direct", "--server", "http://x"]);
        assert!(result.is_err());
    }
}
