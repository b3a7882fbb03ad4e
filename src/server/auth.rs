//! Email-domain session gate.
//!
//! Google sign-in happens in a fronting OAuth proxy, which forwards the
//! verified address in [`EMAIL_HEADER`]. The relay only checks that the
//! address belongs to the allowed domain.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;

pub const EMAIL_HEADER: &str = "x-auth-request-email";

/// Allow-list of one email domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDomainPolicy {
    domain: String,
}

impl EmailDomainPolicy {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.trim().trim_start_matches('@').to_ascii_lowercase(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn allows(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        match email.rsplit_once('@') {
            Some((local, domain)) => !local.is_empty() && domain == self.domain,
            None => false,
        }
    }
}

/// Reject requests without a session from the allowed domain.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(policy) = state.email_policy.as_ref() else {
        return next.run(request).await;
    };

    let email = request
        .headers()
        .get(EMAIL_HEADER)
        .and_then(|v| v.to_str().ok());

    match email {
        Some(email) if policy.allows(email) => next.run(request).await,
        Some(email) => {
            warn!(email, "session outside the allowed domain");
            (StatusCode::FORBIDDEN, "Email domain not allowed").into_response()
        }
        None => {
            warn!("request without a session");
            (StatusCode::UNAUTHORIZED, "Missing session").into_response()
        }
    }
}
