//! GitHub Copilot Extension endpoint.
//!
//! In development mode the body is parsed without verification and answered
//! through intent matching (or an explicit `tool_call`). In production the
//! signature is checked, then a completion with the agent functions attached
//! is streamed back as plain text, running every tool call the model makes.

use super::completion::CompletionEvent;
use super::routes::AppState;
use super::types::CopilotPayload;
use super::verify::VerificationError;
use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;

const TOKEN_HEADER: &str = "x-github-token";
const SIGNATURE_HEADER: &str = "x-github-public-key-signature";
const KEY_ID_HEADER: &str = "x-github-public-key-identifier";

fn plain_text(status: StatusCode, body: impl Into<Body>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, VerificationError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(VerificationError::MissingHeader(name))
}

/// `POST /`
pub async fn handle(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if state.config.dev_mode {
        development(&state, &body).await
    } else {
        production(state, &headers, body).await
    }
}

async fn development(state: &AppState, body: &[u8]) -> Response {
    tracing::debug!("Development mode: skipping request verification");
    let payload = serde_json::from_slice::<CopilotPayload>(body).unwrap_or_else(|e| {
        tracing::debug!("Unparseable development payload ({}), using fallback", e);
        CopilotPayload::fallback()
    });
    let user = payload.user_name().unwrap_or("test-user");

    let text = match &payload.tool_call {
        Some(call) => {
            state
                .assistant
                .run_tool_call(user, &call.name, &call.arguments_json())
                .await
        }
        None => {
            state
                .assistant
                .respond_to_text(user, payload.last_content())
                .await
        }
    };
    plain_text(StatusCode::OK, text)
}

async fn verify(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<String, VerificationError> {
    let token = header_str(headers, TOKEN_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;
    let key_id = header_str(headers, KEY_ID_HEADER)?;
    state
        .verifier
        .verify(body, signature, key_id, Some(token))
        .await?;
    Ok(token.to_string())
}

async fn production(state: Arc<AppState>, headers: &HeaderMap, body: Bytes) -> Response {
    let token = match verify(&state, headers, &body).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("Copilot request verification failed: {}", e);
            return plain_text(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    };

    let payload: CopilotPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Verified Copilot payload is not valid JSON: {}", e);
            return plain_text(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };
    let user = payload.user_name().unwrap_or("default").to_string();

    let mut events = Box::pin(state.completions.stream(&token, payload.messages));
    let first = match events.next().await {
        Some(Err(e)) => {
            tracing::error!("Error processing Copilot request: {}", e);
            return plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
        first => first,
    };

    let assistant = state.assistant.clone();
    let stream = async_stream::stream! {
        let mut next = first;
        while let Some(event) = next {
            match event {
                Ok(CompletionEvent::Content(text)) => yield Ok::<Bytes, Infallible>(Bytes::from(text)),
                Ok(CompletionEvent::ToolCall { name, arguments }) => {
                    tracing::info!(function = %name, user = %user, "Running assistant function");
                    let text = assistant.run_tool_call(&user, &name, &arguments).await;
                    yield Ok(Bytes::from(text));
                }
                Err(e) => {
                    tracing::error!("Completion stream ended with error: {}", e);
                    break;
                }
            }
            next = events.next().await;
        }
    };
    plain_text(StatusCode::OK, Body::from_stream(stream))
}
