// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the retrieval pipeline
//!
//! - Index construction errors (dimension mismatch, invalid vectors, duplicates)
//! - Retrieval errors (embedding failures, model not ready)

use thiserror::Error;

use crate::embeddings::EmbeddingError;

/// Errors raised while building or querying a [`VectorIndex`](super::VectorIndex)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Vector length differs from the index dimension
    #[error("Dimension mismatch: expected {expected}D, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or Infinity
    #[error("Invalid vector for entry {id}: contains NaN or Infinity")]
    InvalidVector { id: String },

    #[error("Duplicate entry id: {0}")]
    DuplicateId(String),

    /// Zero-length vector
    #[error("Empty vector for entry {id}")]
    EmptyVector { id: String },
}

/// Errors surfaced by [`RetrievalPipeline`](super::RetrievalPipeline)
#[derive(Error, Debug, Clone)]
pub enum RetrievalError {
    /// Embedding a sentence or the query failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Model produced a vector of a different dimension than the index
    #[error("Query dimension {actual} does not match index dimension {expected}")]
    QueryDimension { expected: usize, actual: usize },
}

impl RetrievalError {
    /// Get user-friendly error message for API responses
    pub fn user_message(&self) -> String {
        match self {
            RetrievalError::Embedding(EmbeddingError::ModelLoad(_)) => {
                "The embedding model failed to load; document search is unavailable".to_string()
            }
            RetrievalError::Embedding(EmbeddingError::NotReady(_)) => {
                "The embedding model is still loading".to_string()
            }
            RetrievalError::Index(IndexError::DimensionMismatch { expected, actual })
            | RetrievalError::QueryDimension { expected, actual } => {
                format!(
                    "Index integrity error: expected {}D vectors, found {}D",
                    expected, actual
                )
            }
            _ => self.to_string(),
        }
    }

    /// Get error code for logging and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RetrievalError::Embedding(EmbeddingError::ModelLoad(_)) => "MODEL_LOAD_FAILED",
            RetrievalError::Embedding(EmbeddingError::NotReady(_)) => "MODEL_NOT_READY",
            RetrievalError::Embedding(_) => "EMBEDDING_FAILED",
            RetrievalError::Index(IndexError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            RetrievalError::Index(IndexError::InvalidVector { .. }) => "INVALID_VECTOR",
            RetrievalError::Index(IndexError::DuplicateId(_)) => "DUPLICATE_ID",
            RetrievalError::Index(IndexError::EmptyVector { .. }) => "EMPTY_VECTOR",
            RetrievalError::QueryDimension { .. } => "QUERY_DIMENSION_MISMATCH",
        }
    }

    /// Model-load failures are fatal and never retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::Embedding(EmbeddingError::Inference(_))
                | RetrievalError::Embedding(EmbeddingError::NotReady(_))
        )
    }
}
