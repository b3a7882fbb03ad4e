//! Run relay HTTP server.
//!
//! Proxies thread creation, run start, tool-output submission and file
//! downloads to the upstream assistant service. Run streams are piped back
//! byte for byte; the relay never inspects or buffers them.

pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::assistants::{AssistantsApi, OpenAiAssistants};
use crate::config::PortalConfig;
use crate::error::Result;

pub use auth::EmailDomainPolicy;
pub use error::ApiError;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub assistants: Arc<dyn AssistantsApi>,
    /// Session gate; `None` leaves the relay open.
    pub email_policy: Option<EmailDomainPolicy>,
}

impl AppState {
    pub fn new(assistants: Arc<dyn AssistantsApi>) -> Self {
        Self {
            assistants,
            email_policy: None,
        }
    }

    pub fn with_email_policy(mut self, policy: Option<EmailDomainPolicy>) -> Self {
        self.email_policy = policy;
        self
    }
}

/// Build the relay router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/threads", post(routes::create_thread))
        .route("/threads/:thread_id/messages", post(routes::post_message))
        .route("/threads/:thread_id/actions", post(routes::submit_actions))
        .route("/files/:file_id", get(routes::download_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &PortalConfig) -> Result<()> {
    let assistants = OpenAiAssistants::from_config(config)?;
    let policy = config
        .allowed_email_domain
        .as_deref()
        .map(EmailDomainPolicy::new);
    if let Some(ref policy) = policy {
        info!(domain = policy.domain(), "email-domain session gate enabled");
    }

    let state = AppState::new(Arc::new(assistants)).with_email_policy(policy);
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
