//! portal-ai binary entry point.

use clap::Parser;
use portal_ai::cli::{Cli, Commands};
use portal_ai::config::PortalConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Commands::Serve(_) => "portal_ai=info",
        Commands::Chat(_) => "portal_ai=warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = PortalConfig::from_env();

    let result = match cli.command {
        Commands::Serve(args) => {
            if let Some(bind) = args.bind {
                config.bind_addr = bind;
            }
            portal_ai::server::serve(&config).await
        }
        Commands::Chat(args) => portal_ai::cli::chat::run(&config, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
