// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR'd document chat
//!
//! Pages of text recognized from a document are split into sentences,
//! embedded with a sentence-transformer model and indexed in memory. Chat
//! turns retrieve the closest sentences and hand them, with the conversation,
//! to a remote completion API.

pub mod api;
pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod ocr;
pub mod rag;
pub mod segmenter;
pub mod session;
pub mod storage;
pub mod version;

pub use chat::{ChatMessage, ChatRequest, ChatRole, Conversation, ExtractionField};
pub use completion::{CompletionClient, CompletionOutput, OpenAiCompletionClient};
pub use config::NodeConfig;
pub use document::{DocumentPage, SentencePayload, SentenceUnit};
pub use embeddings::{Embedder, EmbeddingService, HashingEmbedder, OnnxEmbeddingModel};
pub use rag::{RetrievalPipeline, VectorIndex};
pub use session::{ChatSession, SessionManager};
