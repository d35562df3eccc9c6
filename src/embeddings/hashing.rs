// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Feature-hashing embedder
//!
//! A deterministic bag-of-words model that needs no model files. Each
//! lowercased word token (plus `[CLS]`/`[SEP]` markers, mirroring BERT input)
//! is mapped by SHA-256 to a signed one-hot vector; token vectors are
//! mean-pooled and the result is L2-normalized. Texts sharing many words land
//! close together, identical texts embed identically.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{l2_normalize, Embedder, EmbeddingError};

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::ModelLoad(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("feature-hashing-{}", dimension),
        })
    }

    /// Synchronous embedding, used directly by benches and the CLI
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut pooled = vec![0.0f32; self.dimension];

        for token in &tokens {
            let (bucket, sign) = self.bucket(token);
            pooled[bucket] += sign;
        }
        for value in &mut pooled {
            *value /= tokens.len() as f32;
        }

        l2_normalize(&mut pooled);
        pooled
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(head);

        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

/// Lowercased alphanumeric word tokens wrapped in `[CLS]` ... `[SEP]`
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = vec![CLS_TOKEN.to_string()];
    tokens.extend(
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| word.to_lowercase()),
    );
    tokens.push(SEP_TOKEN.to_string());
    tokens
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
