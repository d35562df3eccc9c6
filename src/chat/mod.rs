// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat context assembly
//!
//! Conversation history plus the two ways a user turn is built from a
//! document: free-text questions answered from retrieved sentences, and
//! structured extraction forced through a single function call.

pub mod assembler;
pub mod conversation;

pub use assembler::{
    assemble_extraction, assemble_free_text, extraction_function, extraction_prompt,
    free_text_prompt, ChatRequest, ExtractionField, FunctionCall, FunctionDescriptor,
    FunctionParameters, PropertySchema, EXTRACTION_FUNCTION_DESCRIPTION, EXTRACTION_FUNCTION_NAME,
};
pub use conversation::{ChatMessage, ChatRole, Conversation, SYSTEM_PROMPT};

use thiserror::Error;

/// Errors raised while assembling a chat request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Query must not be empty")]
    EmptyQuery,

    /// Structured extraction needs at least one field
    #[error("At least one extraction field is required")]
    NoFields,

    #[error("Extraction field {position} has an empty name")]
    EmptyFieldName { position: usize },

    /// Names must look like identifiers (snake_case recommended)
    #[error("Invalid extraction field name '{0}': use letters, digits and underscores")]
    InvalidFieldName(String),

    #[error("Duplicate extraction field name '{0}'")]
    DuplicateFieldName(String),
}
