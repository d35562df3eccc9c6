// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session response types

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::document::{DocumentPage, SentencePayload};
use crate::rag::IndexStats;

#[derive(Debug, Clone, Serialize)]
pub struct OcrIngestResponse {
    /// Recognized pages, in input order
    pub pages: Vec<DocumentPage>,
    pub stats: IndexStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub matches: Vec<SentencePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub reply: String,
    /// Sentences placed into the prompt
    pub context: Vec<SentencePayload>,
    /// Full conversation after this turn
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}
