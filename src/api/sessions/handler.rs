// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session endpoint handlers
//!
//! Every handler that creates a session waits for the embedding model; a
//! failed model load surfaces as 503.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{debug, info, warn};

use super::request::{
    ChatTurnRequest, ExtractRequest, IndexDocumentRequest, OcrImagesRequest, RetrieveRequest,
};
use super::response::{ChatTurnResponse, MessagesResponse, OcrIngestResponse, RetrieveResponse};
use crate::api::credentials::credential_from_headers;
use crate::api::errors::ApiError;
use crate::api::http_server::{ApiErrorResponse, AppState};
use crate::ocr::parse_page_images;
use crate::rag::IndexStats;
use crate::session::ExtractionResult;

fn require_credential(headers: &HeaderMap) -> Result<String, ApiErrorResponse> {
    credential_from_headers(headers).ok_or_else(|| {
        ApiErrorResponse(ApiError::Unauthorized(
            "completion credential required".to_string(),
        ))
    })
}

/// POST /v1/sessions/:id/documents - Index already recognized pages
///
/// Replaces the session's document; the pages are stored so the index can be
/// rebuilt after a restart.
pub async fn index_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<IndexDocumentRequest>,
) -> Result<Json<IndexStats>, ApiErrorResponse> {
    debug!("Session {}: indexing {} pages", id, request.pages.len());
    let session = state.sessions.get_or_create(&id).await?;
    let stats = session.index_pages(request.pages).await?;
    info!(
        "Session {}: indexed {} sentences from {} pages",
        id, stats.sentences, stats.pages
    );
    Ok(Json(stats))
}

/// POST /v1/sessions/:id/ocr - Recognize page images and index the text
///
/// # Errors
/// - 400 Bad Request: missing or undecodable images
/// - 503 Service Unavailable: no OCR backend configured
/// - 502 Bad Gateway: recognition failed
pub async fn ocr_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OcrImagesRequest>,
) -> Result<Json<OcrIngestResponse>, ApiErrorResponse> {
    request.validate().map_err(|e| {
        warn!("OCR validation failed: {}", e);
        e
    })?;
    let recognizer = state.recognizer.clone().ok_or_else(|| {
        warn!("OCR requested but no recognizer is configured");
        ApiError::ServiceUnavailable("OCR service not available".to_string())
    })?;

    let images = parse_page_images(&request.images).map_err(ApiError::from)?;
    let session = state.sessions.get_or_create(&id).await?;
    let (pages, stats) = session.ingest_images(&images, recognizer.as_ref()).await?;

    info!("Session {}: OCR produced {} pages", id, pages.len());
    Ok(Json(OcrIngestResponse { pages, stats }))
}

/// POST /v1/sessions/:id/retrieve - Nearest sentences for a query
pub async fn retrieve_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiErrorResponse> {
    request.validate()?;
    let k = request.k.unwrap_or(state.top_k);
    let session = state.sessions.get_or_create(&id).await?;
    let matches = session.retrieve(&request.query, k).await?;
    Ok(Json(RetrieveResponse { matches }))
}

/// POST /v1/sessions/:id/chat - One retrieval-augmented chat turn
///
/// # Errors
/// - 401 Unauthorized: no completion credential
/// - 400 Bad Request: blank message
/// - 502 Bad Gateway: the completion API failed; history is unchanged
pub async fn chat_turn_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ApiErrorResponse> {
    let credential = require_credential(&headers)?;
    request.validate()?;
    let k = request.k.unwrap_or(state.top_k);

    let session = state.sessions.get_or_create(&id).await?;
    let turn = session
        .ask(&request.message, k, state.completion.as_ref(), &credential)
        .await?;
    let messages = session.messages().await;

    Ok(Json(ChatTurnResponse {
        reply: turn.reply,
        context: turn.context,
        messages,
    }))
}

/// POST /v1/sessions/:id/extract - Structured extraction over the whole document
pub async fn extract_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractionResult>, ApiErrorResponse> {
    let credential = require_credential(&headers)?;
    request.validate()?;

    let session = state.sessions.get_or_create(&id).await?;
    let result = session
        .extract(&request.fields, state.completion.as_ref(), &credential)
        .await?;
    Ok(Json(result))
}

/// GET /v1/sessions/:id/messages
pub async fn messages_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiErrorResponse> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session '{}'", id)))?;
    Ok(Json(MessagesResponse {
        messages: session.messages().await,
    }))
}

/// DELETE /v1/sessions/:id - Drop the session and its stored pages
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiErrorResponse> {
    if state.sessions.remove(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session '{}'", id)).into())
    }
}
