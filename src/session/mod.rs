// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat sessions
//!
//! A session owns one retrieval pipeline (and so exactly one active index),
//! one conversation, and its slice of the document store. Nothing is shared
//! between sessions except the process-wide embedding model.

pub mod chat_session;
pub mod manager;

use thiserror::Error;

use crate::chat::ChatError;
use crate::completion::CompletionError;
use crate::embeddings::EmbeddingError;
use crate::ocr::OcrError;
use crate::rag::RetrievalError;
use crate::storage::StorageError;

pub use chat_session::{ChatSession, ChatTurn, ExtractionResult};
pub use manager::SessionManager;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    /// The forced function call did not return a JSON object
    #[error("Extraction returned invalid arguments: {0}")]
    InvalidExtraction(String),
}
