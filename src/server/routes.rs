//! Route handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::error::PortalError;
use crate::stream::ByteStream;
use crate::types::ToolOutput;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadResponse {
    pub thread_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActionsRequest {
    pub run_id: String,
    pub tool_call_outputs: Vec<ToolOutput>,
}

/// `POST /threads`
pub async fn create_thread(
    State(state): State<AppState>,
) -> Result<Json<CreateThreadResponse>, ApiError> {
    let thread_id = state.assistants.create_thread().await?;
    Ok(Json(CreateThreadResponse { thread_id }))
}

/// `POST /threads/{id}/messages`: post a user message and stream the run.
pub async fn post_message(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Response, ApiError> {
    if request.content.trim().is_empty() {
        return Err(PortalError::InvalidArgument("message content is empty".into()).into());
    }
    info!(%thread_id, "starting run");
    let stream = state
        .assistants
        .start_run(&thread_id, &request.content)
        .await?;
    Ok(sse_response(stream))
}

/// `POST /threads/{id}/actions`: submit tool outputs and stream the continuation.
pub async fn submit_actions(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(request): Json<SubmitActionsRequest>,
) -> Result<Response, ApiError> {
    info!(
        %thread_id,
        run_id = %request.run_id,
        outputs = request.tool_call_outputs.len(),
        "resuming run"
    );
    let stream = state
        .assistants
        .resume_run(&thread_id, &request.run_id, &request.tool_call_outputs)
        .await?;
    Ok(sse_response(stream))
}

/// `GET /files/{id}`: pass a run-produced file through.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let file = state.assistants.file_content(&file_id).await?;
    let mut headers = HeaderMap::new();
    let content_type = file
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    Ok((headers, Body::from_stream(file.body)).into_response())
}

fn sse_response(stream: ByteStream) -> Response {
    let stream = stream.inspect(|chunk| {
        if let Err(e) = chunk {
            warn!(error = %e, "upstream run stream broke off");
        }
    });

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    (headers, Body::from_stream(stream)).into_response()
}
