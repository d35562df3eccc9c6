// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Immutable in-memory vector index
// Exact nearest-neighbour search over L2-normalized sentence embeddings

use serde::Serialize;
use std::collections::HashSet;

use super::errors::IndexError;
use crate::document::SentencePayload;
use crate::embeddings::dot;

/// Entry handed to [`VectorIndex::build`]
#[derive(Clone, Debug)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: SentencePayload,
}

impl IndexEntry {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, payload: SentencePayload) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

/// Result from vector search
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchMatch {
    pub id: String,
    pub payload: SentencePayload,
    pub score: f32,
}

/// Exact-search vector index
///
/// - Built once from a complete set of entries, never mutated afterwards
/// - Score is cosine similarity, computed as the dot product of unit vectors
/// - Results ordered by score descending; equal scores keep insertion order
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Build an index from `entries`
    ///
    /// # Returns
    /// * `Err(DimensionMismatch)` if vectors have different lengths
    /// * `Err(InvalidVector)` if any value is NaN or Infinity
    /// * `Err(DuplicateId)` if two entries share an id
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        let mut dimension = None;
        let mut seen = HashSet::with_capacity(entries.len());

        for entry in &entries {
            if entry.vector.is_empty() {
                return Err(IndexError::EmptyVector {
                    id: entry.id.clone(),
                });
            }

            match dimension {
                None => dimension = Some(entry.vector.len()),
                Some(expected) if expected != entry.vector.len() => {
                    return Err(IndexError::DimensionMismatch {
                        expected,
                        actual: entry.vector.len(),
                    });
                }
                Some(_) => {}
            }

            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::InvalidVector {
                    id: entry.id.clone(),
                });
            }

            if !seen.insert(entry.id.as_str()) {
                return Err(IndexError::DuplicateId(entry.id.clone()));
            }
        }

        Ok(Self { entries, dimension })
    }

    /// Top-`k` entries most similar to `query`
    ///
    /// Returns `min(k, len())` matches. An empty index returns no matches for
    /// any query; a non-empty index rejects a query of the wrong dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchMatch>, IndexError> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, dot(query, &entry.vector)))
            .collect();

        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let entry = &self.entries[position];
                SearchMatch {
                    id: entry.id.clone(),
                    payload: entry.payload.clone(),
                    score,
                }
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimension, `None` for an empty index
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}
