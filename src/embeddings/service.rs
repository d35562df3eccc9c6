// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding model lifecycle
//!
//! The embedding model is loaded once per process, asynchronously, and every
//! retrieval depends on it. `EmbeddingService` makes that explicit:
//!
//! ```text
//! Uninitialized --start_loading--> Loading --ok--> Ready
//!                                          \--err--> Failed (terminal, not retried)
//! ```
//!
//! Callers obtain the model only through [`EmbeddingService::await_ready`],
//! so `embed` cannot be reached before loading has finished.

use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use super::{
    fetch_model_files, Embedder, EmbeddingError, HashingEmbedder, ModelFiles, OnnxEmbeddingModel,
};
use crate::config::{EmbeddingBackend, EmbeddingConfig};

/// Public view of the lifecycle phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ModelState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::Failed(_) => "failed",
        }
    }
}

enum LoadState {
    Uninitialized,
    Loading,
    Ready(Arc<dyn Embedder>),
    Failed(EmbeddingError),
}

/// Process-wide, lazily initialized embedding model
///
/// # Example
/// ```ignore
/// let service = EmbeddingService::new();
/// service.start_loading(|| async {
///     let model = OnnxEmbeddingModel::new("all-MiniLM-L6-v2", model_path, tokenizer_path).await?;
///     Ok(Arc::new(model) as Arc<dyn Embedder>)
/// });
/// let embedder = service.await_ready().await?;
/// ```
#[derive(Clone)]
pub struct EmbeddingService {
    state: Arc<watch::Sender<LoadState>>,
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("state", &self.state())
            .finish()
    }
}

impl EmbeddingService {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadState::Uninitialized);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Service that is already `Ready` with the given model
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Ready(embedder));
        Self {
            state: Arc::new(tx),
        }
    }

    /// Start loading the model in the background
    ///
    /// Only the first call has an effect; returns `false` when loading was
    /// already started (or finished).
    pub fn start_loading<F, Fut>(&self, loader: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Arc<dyn Embedder>>> + Send + 'static,
    {
        let started = self.state.send_if_modified(|state| {
            if matches!(state, LoadState::Uninitialized) {
                *state = LoadState::Loading;
                true
            } else {
                false
            }
        });
        if !started {
            return false;
        }

        info!("Loading embedding model");
        let state = self.state.clone();
        tokio::spawn(async move {
            let next = match tokio::spawn(loader()).await {
                Ok(Ok(embedder)) => {
                    info!(
                        "Embedding model ready: {} ({} dimensions)",
                        embedder.model_name(),
                        embedder.dimension()
                    );
                    LoadState::Ready(embedder)
                }
                Ok(Err(e)) => {
                    error!("Embedding model failed to load: {:#}", e);
                    LoadState::Failed(EmbeddingError::ModelLoad(format!("{:#}", e)))
                }
                Err(e) => {
                    error!("Embedding model loader task failed: {}", e);
                    LoadState::Failed(EmbeddingError::ModelLoad(e.to_string()))
                }
            };
            state.send_replace(next);
        });

        true
    }

    /// Start loading and wait for the outcome
    pub async fn load<F, Fut>(&self, loader: F) -> Result<Arc<dyn Embedder>, EmbeddingError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Arc<dyn Embedder>>> + Send + 'static,
    {
        self.start_loading(loader);
        self.await_ready().await
    }

    /// Wait until the model is `Ready`
    ///
    /// # Errors
    /// - `ModelLoad` if loading failed (fatal; the service never recovers)
    /// - `NotReady` if loading was never started
    pub async fn await_ready(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        let mut rx = self.state.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                match &*state {
                    LoadState::Ready(embedder) => return Ok(embedder.clone()),
                    LoadState::Failed(e) => return Err(e.clone()),
                    LoadState::Uninitialized => {
                        return Err(EmbeddingError::NotReady("uninitialized".to_string()))
                    }
                    LoadState::Loading => {}
                }
            }
            if rx.changed().await.is_err() {
                return Err(EmbeddingError::NotReady("loader dropped".to_string()));
            }
        }
    }

    /// The model if it is ready, without waiting
    pub fn embedder(&self) -> Option<Arc<dyn Embedder>> {
        match &*self.state.borrow() {
            LoadState::Ready(embedder) => Some(embedder.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> ModelState {
        match &*self.state.borrow() {
            LoadState::Uninitialized => ModelState::Uninitialized,
            LoadState::Loading => ModelState::Loading,
            LoadState::Ready(_) => ModelState::Ready,
            LoadState::Failed(e) => ModelState::Failed(e.to_string()),
        }
    }
}

/// Load the model selected by `config`
///
/// ONNX files come from the configured local paths, or are fetched from the
/// HuggingFace hub otherwise.
pub async fn load_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension)?)),
        EmbeddingBackend::Onnx => {
            let files = match (&config.model_path, &config.tokenizer_path) {
                (Some(model), Some(tokenizer)) => ModelFiles::local(model, tokenizer),
                _ => fetch_model_files(&config.model_repo, None).await?,
            };
            let name = config
                .model_repo
                .rsplit('/')
                .next()
                .unwrap_or(&config.model_repo)
                .to_string();
            let model =
                OnnxEmbeddingModel::new(name, &files.model_path, &files.tokenizer_path).await?;
            Ok(Arc::new(model))
        }
    }
}
