// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// A single chat session over one document

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::SessionError;
use crate::chat::{
    assemble_extraction, assemble_free_text, ChatMessage, ChatRole, Conversation, ExtractionField,
};
use crate::completion::{CompletionClient, CompletionError, CompletionOutput};
use crate::document::{DocumentPage, SentencePayload};
use crate::embeddings::Embedder;
use crate::ocr::{ocr_document, PageImage, TextRecognizer};
use crate::rag::{IndexStats, RetrievalPipeline};
use crate::storage::DocumentStore;

/// Outcome of a free-text chat turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub reply: String,
    /// Sentences that were put into the prompt
    pub context: Vec<SentencePayload>,
}

/// Outcome of a structured extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Parsed function arguments
    pub data: serde_json::Value,
    /// Arguments exactly as returned by the model
    pub raw: String,
}

pub struct ChatSession {
    id: String,
    pipeline: RetrievalPipeline,
    conversation: Mutex<Conversation>,
    documents: DocumentStore,
    // Held across build and save so the stored pages follow the live index
    indexing: Mutex<()>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("documents", &self.documents.key())
            .finish()
    }
}

impl ChatSession {
    pub fn new(
        id: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        concurrency: usize,
        documents: DocumentStore,
    ) -> Self {
        Self {
            id: id.into(),
            pipeline: RetrievalPipeline::with_concurrency(embedder, concurrency),
            conversation: Mutex::new(Conversation::new()),
            documents,
            indexing: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pipeline(&self) -> &RetrievalPipeline {
        &self.pipeline
    }

    /// Rebuild the index from `pages`, then store them
    ///
    /// A failed build stores nothing and keeps the previous document.
    pub async fn index_pages(&self, pages: Vec<DocumentPage>) -> Result<IndexStats, SessionError> {
        let _guard = self.indexing.lock().await;
        let stats = self.pipeline.index_document(pages.clone()).await?;
        self.documents.save_pages(&pages).await?;
        Ok(stats)
    }

    /// Rebuild the index from the stored pages, if any were stored
    pub async fn restore(&self) -> Result<Option<IndexStats>, SessionError> {
        let pages = self.documents.load_pages().await?;
        if pages.is_empty() {
            return Ok(None);
        }
        info!("Session {}: restoring {} stored pages", self.id, pages.len());
        Ok(Some(self.pipeline.index_document(pages).await?))
    }

    /// OCR `images`, then store and index the resulting pages
    pub async fn ingest_images(
        &self,
        images: &[PageImage],
        recognizer: &dyn TextRecognizer,
    ) -> Result<(Vec<DocumentPage>, IndexStats), SessionError> {
        let pages = ocr_document(images, recognizer).await?;
        let stats = self.index_pages(pages.clone()).await?;
        Ok((pages, stats))
    }

    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SentencePayload>, SessionError> {
        Ok(self.pipeline.retrieve(query, k).await?)
    }

    /// Answer `query` from the `k` most relevant sentences
    ///
    /// The user and assistant messages are committed to the conversation
    /// together, only once the completion succeeded.
    pub async fn ask(
        &self,
        query: &str,
        k: usize,
        client: &dyn CompletionClient,
        credential: &str,
    ) -> Result<ChatTurn, SessionError> {
        let context = self.pipeline.retrieve(query, k).await?;

        let mut conversation = self.conversation.lock().await;
        let mut draft = conversation.clone();
        let request = assemble_free_text(&mut draft, query, &context)?;

        let reply = match client.complete(&request, credential).await? {
            CompletionOutput::Text(text) => text,
            CompletionOutput::FunctionArguments(arguments) => arguments,
        };
        draft.push(ChatRole::Assistant, reply.clone());
        *conversation = draft;

        debug!(
            "Session {}: answered with {} context sentences",
            self.id,
            context.len()
        );
        Ok(ChatTurn { reply, context })
    }

    /// Pull `fields` out of the whole document through a forced function call
    pub async fn extract(
        &self,
        fields: &[ExtractionField],
        client: &dyn CompletionClient,
        credential: &str,
    ) -> Result<ExtractionResult, SessionError> {
        let document_text = self.pipeline.document_text().await;

        let mut conversation = self.conversation.lock().await;
        let mut draft = conversation.clone();
        let request = assemble_extraction(&mut draft, &document_text, fields)?;

        let raw = match client.complete(&request, credential).await? {
            CompletionOutput::FunctionArguments(arguments) => arguments,
            CompletionOutput::Text(_) => {
                return Err(CompletionError::Decode(
                    "expected a function call, got plain text".to_string(),
                )
                .into())
            }
        };
        let data: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| SessionError::InvalidExtraction(e.to_string()))?;
        if !data.is_object() {
            return Err(SessionError::InvalidExtraction(
                "arguments are not a JSON object".to_string(),
            ));
        }

        draft.push(ChatRole::Assistant, raw.clone());
        *conversation = draft;

        Ok(ExtractionResult { data, raw })
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.conversation.lock().await.messages().to_vec()
    }

    /// Forget the stored pages of this session
    pub async fn clear_documents(&self) -> Result<bool, SessionError> {
        Ok(self.documents.clear().await?)
    }
}
