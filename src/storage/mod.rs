// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client-local persistent storage
//!
//! A string-keyed store the upload flow and the chat flow share. The OCR'd
//! pages of a document live under the `"ocr"` key as a JSON array of
//! `{"image", "text"}` objects.

pub mod document_store;
pub mod file_store;
pub mod memory_store;

use async_trait::async_trait;
use thiserror::Error;

pub use document_store::{DocumentStore, OCR_KEY};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value is not the expected JSON shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String-keyed value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `None` when the key was never set (or was removed)
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Returns whether the key existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// Keys are `/`-separated segments of `[A-Za-z0-9_.-]`, never `.` or `..`
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Empty key".to_string()));
    }

    for segment in key.split('/') {
        let valid = !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
    }

    Ok(())
}
