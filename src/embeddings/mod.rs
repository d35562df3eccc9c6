// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sentence embeddings
//!
//! Every model behind [`Embedder`] mean-pools token representations into one
//! vector per input and L2-normalizes it, so cosine similarity between two
//! embeddings is a plain dot product.

pub mod hashing;
pub mod model_files;
pub mod onnx_model;
pub mod service;

use async_trait::async_trait;
use thiserror::Error;

pub use hashing::HashingEmbedder;
pub use model_files::{fetch_model_files, ModelFiles};
pub use onnx_model::OnnxEmbeddingModel;
pub use service::{EmbeddingService, ModelState};

/// Default sentence-transformer model
pub const DEFAULT_MODEL_REPO: &str = "Xenova/all-MiniLM-L6-v2";

/// Output dimension of all-MiniLM-L6-v2
pub const DEFAULT_DIMENSION: usize = 384;

/// Errors raised while loading or running an embedding model
#[derive(Error, Debug, Clone)]
pub enum EmbeddingError {
    /// Model files could not be fetched or opened
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    /// Model produced a vector of the wrong length
    #[error("Unexpected embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `embed` was called before the model finished loading
    #[error("Embedding model is not ready (state: {0})")]
    NotReady(String),
}

impl From<anyhow::Error> for EmbeddingError {
    fn from(err: anyhow::Error) -> Self {
        EmbeddingError::Inference(err.to_string())
    }
}

/// A loaded feature-extraction model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one string into a unit-length vector of `dimension()` floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Output dimension, constant for the lifetime of the model
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Scale `vector` to unit L2 norm in place. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Dot product of two equal-length vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot(a, b) / (norm_a * norm_b)
    }
}
