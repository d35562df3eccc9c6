// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Round-trips OCR'd pages through a key/value store

use std::sync::Arc;

use super::{validate_key, KeyValueStore, StorageError};
use crate::document::DocumentPage;

/// Key holding the JSON array of pages
pub const OCR_KEY: &str = "ocr";

/// Typed access to the `"ocr"` entry of a store
///
/// A scoped store prefixes the key with a namespace (`{namespace}/ocr`) so
/// several sessions can share one backing store.
#[derive(Clone)]
pub struct DocumentStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl DocumentStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: OCR_KEY.to_string(),
        }
    }

    pub fn scoped(store: Arc<dyn KeyValueStore>, namespace: &str) -> Result<Self, StorageError> {
        let key = format!("{}/{}", namespace, OCR_KEY);
        validate_key(&key)?;
        Ok(Self { store, key })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn save_pages(&self, pages: &[DocumentPage]) -> Result<(), StorageError> {
        let json = serde_json::to_string(pages)?;
        self.store.set(&self.key, json).await
    }

    /// Stored pages; an unset key yields no pages, malformed JSON an error
    pub async fn load_pages(&self) -> Result<Vec<DocumentPage>, StorageError> {
        match self.store.get(&self.key).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn clear(&self) -> Result<bool, StorageError> {
        self.store.remove(&self.key).await
    }
}
