// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Session-scoped sentence index for semantic search during chat sessions

pub mod errors;
pub mod index;
pub mod pipeline;

pub use errors::{IndexError, RetrievalError};
pub use index::{IndexEntry, SearchMatch, VectorIndex};
pub use pipeline::{sentence_units, IndexStats, RetrievalPipeline, DEFAULT_EMBED_CONCURRENCY};
