// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Completion relay handler

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use super::request::RelayRequest;
use crate::api::credentials::credential_from_headers;
use crate::api::http_server::AppState;
use crate::completion::{CompletionError, CompletionOutput};

fn relay_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// POST /api/chat - Forward messages to the completion API
///
/// # Request
/// - `messages`: `[{id?, role, content}]` (required)
/// - `fn`: `{name, description, parameters}`; when present the model is
///   forced to call it
/// - credential: cookie `openai-api-key` or `Authorization: Bearer`
///
/// # Response
/// - plain completion: the assistant content as a JSON string
/// - forced function: `{"text": "<arguments JSON>"}`
///
/// # Errors
/// - 401 `{"error": "Unauthorized"}`: no credential
/// - 400 `{"error": "Messages not provided"}`
/// - upstream non-2xx: same status, `{"error": <reason>}`
/// - 500 `{"error": ...}`: transport or decode failure
pub async fn relay_chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(credential) = credential_from_headers(&headers) else {
        return relay_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    let request = if body.is_empty() {
        RelayRequest::default()
    } else {
        match serde_json::from_slice::<RelayRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Relay body rejected: {}", e);
                return relay_error(StatusCode::BAD_REQUEST, format!("Invalid body: {}", e));
            }
        }
    };

    let Some(chat_request) = request.into_chat_request() else {
        return relay_error(StatusCode::BAD_REQUEST, "Messages not provided");
    };
    debug!(
        "Relaying {} messages (function: {:?})",
        chat_request.messages.len(),
        chat_request.forced_function()
    );

    match state.completion.complete(&chat_request, &credential).await {
        Ok(CompletionOutput::Text(content)) => Json(content).into_response(),
        Ok(CompletionOutput::FunctionArguments(arguments)) => {
            Json(json!({ "text": arguments })).into_response()
        }
        Err(CompletionError::UpstreamStatus { status, message }) => {
            warn!("Completion API returned {}: {}", status, message);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            relay_error(status, message)
        }
        Err(CompletionError::MissingCredential) => {
            relay_error(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
        Err(e) => {
            warn!("Relay failed: {}", e);
            relay_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
