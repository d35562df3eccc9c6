// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval pipeline
//!
//! Turns a session's OCR pages into a searchable sentence index and answers
//! top-k queries against it.
//!
//! ## Indexing
//!
//! 1. Segment every page in page order into [`SentenceUnit`]s
//! 2. Embed all sentences with bounded concurrency; results are reassembled in
//!    sentence order whatever order the embeddings complete in
//! 3. Build a fresh [`VectorIndex`] and swap it in as a whole
//!
//! Builds are queued behind a mutex. Each build takes a generation ticket when
//! it is requested, and a finished build only replaces the active index if no
//! newer build has been committed in the meantime. Readers always see either
//! the previous index or the new one, never a partial build.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::errors::RetrievalError;
use super::index::{IndexEntry, SearchMatch, VectorIndex};
use crate::document::{DocumentPage, SentencePayload, SentenceUnit};
use crate::embeddings::{Embedder, EmbeddingError};
use crate::segmenter::segment;

/// Default number of sentences embedded concurrently
pub const DEFAULT_EMBED_CONCURRENCY: usize = 8;

/// Summary of the active index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub pages: usize,
    pub sentences: usize,
    /// Embedding dimension, `None` when the document has no sentences
    pub dimension: Option<usize>,
    pub generation: u64,
}

/// Everything derived from one `index_document` call
#[derive(Debug)]
struct IndexedDocument {
    pages: Vec<DocumentPage>,
    units: Vec<SentenceUnit>,
    index: VectorIndex,
    generation: u64,
}

/// Per-session retrieval state: exactly one active index at a time
pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    concurrency: usize,
    active: RwLock<Option<Arc<IndexedDocument>>>,
    build_lock: Mutex<()>,
    requested: AtomicU64,
}

impl std::fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("model", &self.embedder.model_name())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

/// Segment pages into sentence units, in page order
pub fn sentence_units(pages: &[DocumentPage]) -> Vec<SentenceUnit> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(page_index, page)| {
            segment(&page.text)
                .into_iter()
                .enumerate()
                .map(move |(sentence_index, text)| {
                    SentenceUnit::new(page_index, sentence_index, text)
                })
        })
        .collect()
}

impl RetrievalPipeline {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_concurrency(embedder, DEFAULT_EMBED_CONCURRENCY)
    }

    pub fn with_concurrency(embedder: Arc<dyn Embedder>, concurrency: usize) -> Self {
        Self {
            embedder,
            concurrency: concurrency.max(1),
            active: RwLock::new(None),
            build_lock: Mutex::new(()),
            requested: AtomicU64::new(0),
        }
    }

    /// Replace the session's index with one built from `pages`
    ///
    /// An empty page list (or pages without sentences) yields an empty index,
    /// not an error. On failure the previous index stays active.
    pub async fn index_document(
        &self,
        pages: Vec<DocumentPage>,
    ) -> Result<IndexStats, RetrievalError> {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let _build = self.build_lock.lock().await;

        let start = Instant::now();
        let units = sentence_units(&pages);
        info!(
            "Indexing document: {} pages, {} sentences (build {})",
            pages.len(),
            units.len(),
            ticket
        );

        let vectors = self.embed_all(&units).await?;
        let entries = units
            .iter()
            .zip(vectors)
            .map(|(unit, vector)| IndexEntry::new(unit.id.clone(), vector, unit.payload()))
            .collect();
        let index = VectorIndex::build(entries)?;

        let document = Arc::new(IndexedDocument {
            pages,
            units,
            index,
            generation: ticket,
        });
        let stats = document.stats();

        let mut active = self.active.write().await;
        if let Some(current) = active.as_ref().filter(|c| c.generation > ticket) {
            warn!(
                "Discarding build {} superseded by build {}",
                ticket, current.generation
            );
            return Ok(current.stats());
        }
        *active = Some(document);
        drop(active);

        info!(
            "Index build {} complete: {} sentences in {:?}",
            ticket,
            stats.sentences,
            start.elapsed()
        );
        Ok(stats)
    }

    /// Payloads of the `k` sentences most similar to `query`
    ///
    /// Empty query or no index built yet: empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SentencePayload>, RetrievalError> {
        Ok(self
            .search(query, k)
            .await?
            .into_iter()
            .map(|m| m.payload)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps ids and scores
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchMatch>, RetrievalError> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let Some(document) = self.active.read().await.clone() else {
            debug!("Retrieve before any document was indexed");
            return Ok(Vec::new());
        };
        if document.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        if let Some(expected) = document.index.dimension() {
            if query_vector.len() != expected {
                return Err(RetrievalError::QueryDimension {
                    expected,
                    actual: query_vector.len(),
                });
            }
        }

        let matches = document.index.search(&query_vector, k)?;
        debug!("Retrieved {} of k={} matches", matches.len(), k);
        Ok(matches)
    }

    /// Sentence units of the active index
    pub async fn sentence_units(&self) -> Vec<SentenceUnit> {
        match self.active.read().await.as_ref() {
            Some(document) => document.units.clone(),
            None => Vec::new(),
        }
    }

    /// `None` until the first successful `index_document`
    pub async fn index_stats(&self) -> Option<IndexStats> {
        self.active.read().await.as_ref().map(|d| d.stats())
    }

    /// Page texts of the active document joined by blank lines
    pub async fn document_text(&self) -> String {
        match self.active.read().await.as_ref() {
            Some(document) => document
                .pages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            None => String::new(),
        }
    }

    /// Pages of the active document
    pub async fn pages(&self) -> Vec<DocumentPage> {
        match self.active.read().await.as_ref() {
            Some(document) => document.pages.clone(),
            None => Vec::new(),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    async fn embed_all(&self, units: &[SentenceUnit]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let expected = self.embedder.dimension();
        let texts: Vec<String> = units.iter().map(|u| u.source_text.clone()).collect();

        // `buffered` yields in input order regardless of completion order
        let vectors: Vec<Vec<f32>> = stream::iter(texts)
            .map(|text| {
                let embedder = self.embedder.clone();
                async move {
                    let vector = embedder.embed(&text).await?;
                    if vector.len() != expected {
                        return Err(EmbeddingError::DimensionMismatch {
                            expected,
                            actual: vector.len(),
                        });
                    }
                    Ok::<_, EmbeddingError>(vector)
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(vectors)
    }
}

impl IndexedDocument {
    fn stats(&self) -> IndexStats {
        IndexStats {
            pages: self.pages.len(),
            sentences: self.units.len(),
            dimension: self.index.dimension(),
            generation: self.generation,
        }
    }
}
