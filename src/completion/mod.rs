// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote chat completion
//!
//! The pipeline only depends on the [`CompletionClient`] seam; the
//! OpenAI-compatible HTTP client lives in [`openai`].

pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::chat::ChatRequest;

pub use openai::{OpenAiCompletionClient, DEFAULT_BASE_URL, DEFAULT_COMPLETION_MODEL};

/// What the model answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CompletionOutput {
    /// Plain assistant text
    Text(String),
    /// Arguments of a forced function call, as the raw JSON string
    FunctionArguments(String),
}

impl CompletionOutput {
    pub fn as_str(&self) -> &str {
        match self {
            CompletionOutput::Text(text) => text,
            CompletionOutput::FunctionArguments(arguments) => arguments,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// No API credential supplied with the request
    #[error("Missing completion API credential")]
    MissingCredential,

    /// Upstream answered with a non-success status
    #[error("Completion endpoint returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Completion request failed: {0}")]
    Transport(String),

    /// Response body did not have the expected shape
    #[error("Invalid completion response: {0}")]
    Decode(String),
}

impl CompletionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CompletionError::MissingCredential => "MISSING_CREDENTIAL",
            CompletionError::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            CompletionError::Transport(_) => "UPSTREAM_UNREACHABLE",
            CompletionError::Decode(_) => "UPSTREAM_INVALID_RESPONSE",
        }
    }
}

/// A remote chat completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `request` authenticated with `credential`
    ///
    /// Failures are returned as-is and never retried.
    async fn complete(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> Result<CompletionOutput, CompletionError>;

    fn model_name(&self) -> &str;
}
