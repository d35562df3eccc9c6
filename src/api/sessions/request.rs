// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::chat::ExtractionField;
use crate::document::DocumentPage;
use crate::ocr::MAX_IMAGE_SIZE;

/// Upper bound on `k` for one retrieval
pub const MAX_TOP_K: usize = 100;

/// Most page images accepted by one OCR request
pub const MAX_IMAGES: usize = 200;

fn validate_k(k: Option<usize>) -> Result<(), ApiError> {
    match k {
        Some(k) if k > MAX_TOP_K => Err(ApiError::ValidationError {
            field: "k".to_string(),
            message: format!("k must be at most {}", MAX_TOP_K),
        }),
        _ => Ok(()),
    }
}

/// POST /v1/sessions/:id/documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocumentRequest {
    pub pages: Vec<DocumentPage>,
}

/// POST /v1/sessions/:id/ocr
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrImagesRequest {
    /// Page images as data URLs or bare base64, in page order
    pub images: Vec<String>,
}

impl OcrImagesRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.images.is_empty() {
            return Err(ApiError::ValidationError {
                field: "images".to_string(),
                message: "at least one image is required".to_string(),
            });
        }
        if self.images.len() > MAX_IMAGES {
            return Err(ApiError::ValidationError {
                field: "images".to_string(),
                message: format!("at most {} images per request", MAX_IMAGES),
            });
        }
        // base64 inflates by 4/3
        let limit = MAX_IMAGE_SIZE / 3 * 4 + 64;
        if let Some(position) = self.images.iter().position(|image| image.len() > limit) {
            return Err(ApiError::ValidationError {
                field: format!("images[{}]", position),
                message: format!("image exceeds maximum size of {} bytes", MAX_IMAGE_SIZE),
            });
        }
        Ok(())
    }
}

/// POST /v1/sessions/:id/retrieve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,

    /// Defaults to the node's configured top-k
    #[serde(default)]
    pub k: Option<usize>,
}

impl RetrieveRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_k(self.k)
    }
}

/// POST /v1/sessions/:id/chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,

    #[serde(default)]
    pub k: Option<usize>,
}

impl ChatTurnRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.message.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "message".to_string(),
                message: "message is required".to_string(),
            });
        }
        validate_k(self.k)
    }
}

/// POST /v1/sessions/:id/extract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub fields: Vec<ExtractionField>,
}

impl ExtractRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.fields.is_empty() {
            return Err(ApiError::ValidationError {
                field: "fields".to_string(),
                message: "at least one field is required".to_string(),
            });
        }
        Ok(())
    }
}
