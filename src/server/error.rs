//! Mapping of relay failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::error::{ErrorCategory, PortalError};

/// A [`PortalError`] returned from a route handler.
#[derive(Debug)]
pub struct ApiError(pub PortalError);

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match (&self.0, self.0.category()) {
            (PortalError::Api { status: 403, .. }, _) => StatusCode::FORBIDDEN,
            (PortalError::InvalidArgument(_), _) => StatusCode::BAD_REQUEST,
            (_, ErrorCategory::Authentication) => StatusCode::UNAUTHORIZED,
            (_, ErrorCategory::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorCategory::RateLimit) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self.0, "relay request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
