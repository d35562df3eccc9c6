// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::chat::ChatError;
use crate::completion::CompletionError;
use crate::embeddings::EmbeddingError;
use crate::ocr::OcrError;
use crate::rag::RetrievalError;
use crate::session::SessionError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    Unauthorized(String),
    ServiceUnavailable(String),
    /// The completion or OCR service failed
    Upstream {
        status: Option<u16>,
        message: String,
    },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::Unauthorized(msg) => ("unauthorized", msg.clone(), None),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::Upstream { status, message } => {
                let details = status.map(|status| {
                    let mut details = HashMap::new();
                    details.insert(
                        "upstream_status".to_string(),
                        serde_json::Value::Number(status.into()),
                    );
                    details
                });
                ("upstream_error", message.clone(), details)
            }
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Upstream { .. } => 502,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::Upstream { message, .. } => write!(f, "Upstream error: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<EmbeddingError> for ApiError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::ModelLoad(_) | EmbeddingError::NotReady(_) => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Embedding(inner) => inner.into(),
            other => ApiError::InternalError(other.user_message()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let field = match err {
            ChatError::EmptyQuery => "message",
            _ => "fields",
        };
        ApiError::ValidationError {
            field: field.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::MissingCredential => ApiError::Unauthorized(err.to_string()),
            CompletionError::UpstreamStatus { status, message } => ApiError::Upstream {
                status: Some(status),
                message,
            },
            other => ApiError::Upstream {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(_) => ApiError::InvalidRequest(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<OcrError> for ApiError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::Image { page, source } => ApiError::ValidationError {
                field: format!("images[{}]", page),
                message: source.to_string(),
            },
            OcrError::Recognition { .. } => ApiError::Upstream {
                status: None,
                message: err.to_string(),
            },
            OcrError::Rasterization(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidId(id) => ApiError::ValidationError {
                field: "id".to_string(),
                message: format!("invalid session id '{}'", id),
            },
            SessionError::Embedding(e) => e.into(),
            SessionError::Retrieval(e) => e.into(),
            SessionError::Chat(e) => e.into(),
            SessionError::Completion(e) => e.into(),
            SessionError::Storage(e) => e.into(),
            SessionError::Ocr(e) => e.into(),
            SessionError::InvalidExtraction(_) => ApiError::Upstream {
                status: None,
                message: err.to_string(),
            },
        }
    }
}
