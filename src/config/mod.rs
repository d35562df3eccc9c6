// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::completion::{DEFAULT_BASE_URL, DEFAULT_COMPLETION_MODEL};
use crate::embeddings::{DEFAULT_DIMENSION, DEFAULT_MODEL_REPO};
use crate::rag::DEFAULT_EMBED_CONCURRENCY;

/// Neighbours retrieved per chat turn
pub const DEFAULT_TOP_K: usize = 5;

/// Which embedding model the node loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 through ONNX Runtime
    Onnx,
    /// Feature hashing, no model files
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onnx" => Ok(EmbeddingBackend::Onnx),
            "hashing" | "hash" => Ok(EmbeddingBackend::Hashing),
            other => Err(format!(
                "Unknown embedding backend '{}' (expected 'onnx' or 'hashing')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// HuggingFace repo used when no local files are given
    pub model_repo: String,
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
    /// Output dimension of the hashing backend
    pub dimension: usize,
    /// Sentences embedded concurrently during an index build
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// VLM sidecar; OCR endpoints are disabled when unset
    pub endpoint: Option<String>,
    pub model: String,
}

/// Configuration of the HTTP node and CLI
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub api_host: String,
    pub api_port: u16,
    pub embedding: EmbeddingConfig,
    pub retrieval_top_k: usize,
    pub completion: CompletionConfig,
    pub ocr: OcrConfig,
    pub storage_dir: PathBuf,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl NodeConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to the defaults; an unknown
    /// `EMBEDDING_BACKEND` is an error.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let backend = match env_string("EMBEDDING_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.embedding.backend,
        };

        Ok(Self {
            api_host: env_string("API_HOST").unwrap_or(defaults.api_host),
            api_port: env_parse("API_PORT").unwrap_or(defaults.api_port),
            embedding: EmbeddingConfig {
                backend,
                model_repo: env_string("EMBEDDING_MODEL_REPO")
                    .unwrap_or(defaults.embedding.model_repo),
                model_path: env_string("EMBEDDING_MODEL_PATH").map(PathBuf::from),
                tokenizer_path: env_string("EMBEDDING_TOKENIZER_PATH").map(PathBuf::from),
                dimension: env_parse("EMBEDDING_DIMENSION")
                    .unwrap_or(defaults.embedding.dimension),
                concurrency: env_parse("EMBED_CONCURRENCY")
                    .unwrap_or(defaults.embedding.concurrency),
            },
            retrieval_top_k: env_parse("RETRIEVAL_TOP_K").unwrap_or(defaults.retrieval_top_k),
            completion: CompletionConfig {
                base_url: env_string("COMPLETION_BASE_URL")
                    .unwrap_or(defaults.completion.base_url),
                model: env_string("COMPLETION_MODEL").unwrap_or(defaults.completion.model),
                timeout_secs: env_parse("COMPLETION_TIMEOUT_SECS")
                    .unwrap_or(defaults.completion.timeout_secs),
            },
            ocr: OcrConfig {
                endpoint: env_string("OCR_ENDPOINT"),
                model: env_string("OCR_MODEL").unwrap_or(defaults.ocr.model),
            },
            storage_dir: env_string("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.embedding.concurrency == 0 {
            return Err("EMBED_CONCURRENCY must be greater than 0".to_string());
        }
        if self.embedding.dimension == 0 {
            return Err("EMBEDDING_DIMENSION must be greater than 0".to_string());
        }
        if self.retrieval_top_k == 0 {
            return Err("RETRIEVAL_TOP_K must be greater than 0".to_string());
        }
        if self.completion.timeout_secs == 0 {
            return Err("COMPLETION_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.embedding.model_path.is_some() != self.embedding.tokenizer_path.is_some() {
            return Err(
                "EMBEDDING_MODEL_PATH and EMBEDDING_TOKENIZER_PATH must be set together"
                    .to_string(),
            );
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .map_err(|e| format!("Invalid listen address {}:{}: {}", self.api_host, self.api_port, e))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 8080,
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::Onnx,
                model_repo: DEFAULT_MODEL_REPO.to_string(),
                model_path: None,
                tokenizer_path: None,
                dimension: DEFAULT_DIMENSION,
                concurrency: DEFAULT_EMBED_CONCURRENCY,
            },
            retrieval_top_k: DEFAULT_TOP_K,
            completion: CompletionConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_COMPLETION_MODEL.to_string(),
                timeout_secs: 120,
            },
            ocr: OcrConfig {
                endpoint: None,
                model: "qwen3-vl".to_string(),
            },
            storage_dir: PathBuf::from("./data"),
        }
    }
}
