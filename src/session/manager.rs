// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Session registry

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::{ChatSession, SessionError};
use crate::embeddings::EmbeddingService;
use crate::storage::{validate_key, DocumentStore, KeyValueStore};

/// Creates sessions on first use and keeps them until removed
///
/// New sessions wait for the embedding model, then rebuild their index from
/// any pages already stored for them.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<ChatSession>>>,
    embeddings: EmbeddingService,
    store: Arc<dyn KeyValueStore>,
    concurrency: usize,
}

impl SessionManager {
    pub fn new(
        embeddings: EmbeddingService,
        store: Arc<dyn KeyValueStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            embeddings,
            store,
            concurrency,
        }
    }

    pub fn embeddings(&self) -> &EmbeddingService {
        &self.embeddings
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ChatSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn get_or_create(&self, id: &str) -> Result<Arc<ChatSession>, SessionError> {
        if let Some(session) = self.get(id).await {
            return Ok(session);
        }
        validate_key(id).map_err(|_| SessionError::InvalidId(id.to_string()))?;
        if id.contains('/') {
            return Err(SessionError::InvalidId(id.to_string()));
        }

        let embedder = self.embeddings.await_ready().await?;
        let documents = DocumentStore::scoped(self.store.clone(), &format!("sessions/{}", id))?;

        // Published only once its stored pages are indexed
        let session = Arc::new(ChatSession::new(id, embedder, self.concurrency, documents));
        session.restore().await?;

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(id) {
            return Ok(existing.clone());
        }
        sessions.insert(id.to_string(), session.clone());
        drop(sessions);

        info!("Created session {}", id);
        Ok(session)
    }

    /// Drop the session and its stored pages
    pub async fn remove(&self, id: &str) -> Result<bool, SessionError> {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.clear_documents().await?;
                info!("Removed session {}", id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
