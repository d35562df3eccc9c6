// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::relay::relay_chat_handler;
use super::sessions::{
    chat_turn_handler, delete_session_handler, extract_handler, index_document_handler,
    messages_handler, ocr_document_handler, retrieve_handler,
};
use super::ApiError;
use crate::completion::CompletionClient;
use crate::embeddings::ModelState;
use crate::ocr::TextRecognizer;
use crate::session::{SessionError, SessionManager};
use crate::version;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub completion: Arc<dyn CompletionClient>,
    /// OCR endpoints answer 503 when unset
    pub recognizer: Option<Arc<dyn TextRecognizer>>,
    /// Default neighbours per retrieval
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingHealth {
    pub state: String,
    pub model: Option<String>,
    pub dimension: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub embedding: EmbeddingHealth,
    pub version: String,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Completion relay
        .route("/api/chat", post(relay_chat_handler))
        // Sessions
        .route("/v1/sessions/:id", delete(delete_session_handler))
        .route("/v1/sessions/:id/documents", post(index_document_handler))
        .route("/v1/sessions/:id/ocr", post(ocr_document_handler))
        .route("/v1/sessions/:id/retrieve", post(retrieve_handler))
        .route("/v1/sessions/:id/chat", post(chat_turn_handler))
        .route("/v1/sessions/:id/extract", post(extract_handler))
        .route("/v1/sessions/:id/messages", get(messages_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let embeddings = state.sessions.embeddings();
    let model_state = embeddings.state();
    let embedder = embeddings.embedder();

    let (status_code, status) = match model_state {
        ModelState::Ready => (StatusCode::OK, "ok"),
        ModelState::Uninitialized | ModelState::Loading => (StatusCode::OK, "loading"),
        ModelState::Failed(_) => (StatusCode::SERVICE_UNAVAILABLE, "failed"),
    };

    let health = HealthResponse {
        status: status.to_string(),
        embedding: EmbeddingHealth {
            state: model_state.as_str().to_string(),
            model: embedder.as_ref().map(|e| e.model_name().to_string()),
            dimension: embedder.as_ref().map(|e| e.dimension()),
        },
        version: version::VERSION.to_string(),
    };
    (status_code, Json(health))
}

// Error response wrapper
pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        ApiErrorResponse(err)
    }
}

impl From<SessionError> for ApiErrorResponse {
    fn from(err: SessionError) -> Self {
        ApiErrorResponse(err.into())
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let request_id = uuid::Uuid::new_v4().to_string();
        if status.is_server_error() {
            tracing::warn!("Request {} failed: {}", request_id, self.0);
        }
        let error_response = self.0.to_response(Some(request_id));

        (status, Json(error_response)).into_response()
    }
}
