// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document records shared by OCR, storage and retrieval

use serde::{Deserialize, Serialize};

/// One scanned page: the page image reference and the text OCR produced for it.
///
/// Serialized exactly as `{"image": "...", "text": "..."}` so that arrays
/// written by the upload flow round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    /// Opaque image reference (data URL, object URL or path)
    pub image: String,
    /// Best-effort OCR text for the page
    pub text: String,
}

impl DocumentPage {
    pub fn new(image: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            text: text.into(),
        }
    }

    /// Page carrying text only (no image reference)
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }
}

/// A sentence cut out of a page, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceUnit {
    /// Unique within one index build (equal to `locator`)
    pub id: String,
    pub source_text: String,
    /// Zero-based index of the page the sentence came from
    pub page_index: usize,
    /// Stable reference path: `/text/{page}/sentence/{sentence}`
    pub locator: String,
}

impl SentenceUnit {
    pub fn new(page_index: usize, sentence_index: usize, source_text: impl Into<String>) -> Self {
        let locator = sentence_locator(page_index, sentence_index);
        Self {
            id: locator.clone(),
            source_text: source_text.into(),
            page_index,
            locator,
        }
    }

    pub fn payload(&self) -> SentencePayload {
        SentencePayload {
            title: self.source_text.clone(),
            url: self.locator.clone(),
        }
    }
}

/// Payload stored next to each vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePayload {
    /// Sentence text
    pub title: String,
    /// Sentence locator
    pub url: String,
}

/// Locator for a sentence. Pages are numbered from 1, sentences from 0.
pub fn sentence_locator(page_index: usize, sentence_index: usize) -> String {
    format!("/text/{}/sentence/{}", page_index + 1, sentence_index)
}
