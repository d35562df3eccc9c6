// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Locating ONNX model files
//!
//! Local paths win; otherwise the files are fetched from the HuggingFace hub
//! (and cached) with `hf-hub`.

use anyhow::{Context, Result};
use hf_hub::api::tokio::ApiBuilder;
use std::path::PathBuf;
use tracing::info;

/// File name of the ONNX export inside a transformers.js style repo
pub const ONNX_MODEL_FILE: &str = "onnx/model.onnx";

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Resolved model + tokenizer paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

impl ModelFiles {
    /// Use files already on disk
    pub fn local(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
        }
    }
}

/// Download (or reuse from cache) the ONNX model and tokenizer of `repo`
///
/// # Arguments
/// * `repo` - HuggingFace repo id, e.g. "Xenova/all-MiniLM-L6-v2"
/// * `cache_dir` - Optional cache directory (hf-hub default when `None`)
pub async fn fetch_model_files(repo: &str, cache_dir: Option<PathBuf>) -> Result<ModelFiles> {
    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir);
    }
    let api = builder.build().context("Failed to create HuggingFace hub client")?;
    let model_repo = api.model(repo.to_string());

    info!("Fetching embedding model files from {}", repo);

    let model_path = model_repo
        .get(ONNX_MODEL_FILE)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", ONNX_MODEL_FILE, repo))?;
    let tokenizer_path = model_repo
        .get(TOKENIZER_FILE)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", TOKENIZER_FILE, repo))?;

    info!("Embedding model files ready: {}", model_path.display());

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
    })
}
