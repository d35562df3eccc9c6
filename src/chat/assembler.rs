// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Builds outbound chat requests
//!
//! Both modes append exactly one user message to the conversation and return
//! a [`ChatRequest`] carrying the whole history:
//!
//! - **Free text**: the question followed by the retrieved sentences
//! - **Extraction**: the full document text plus a forced `extract_data`
//!   function whose parameters have one string property per field

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use super::conversation::{ChatMessage, ChatRole, Conversation};
use super::ChatError;
use crate::document::SentencePayload;

pub const EXTRACTION_FUNCTION_NAME: &str = "extract_data";
pub const EXTRACTION_FUNCTION_DESCRIPTION: &str = "Extract data from document";

/// A field the user wants pulled out of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionField {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ExtractionField {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// JSON schema of the function arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameters {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, PropertySchema>,
    /// Passed through when a relay client sends it; extraction leaves it empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
}

/// Request handed to a completion client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatRequest {
    /// Plain request without functions
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            functions: None,
            function_call: None,
        }
    }

    /// Request forcing a call to `function`
    pub fn with_function(messages: Vec<ChatMessage>, function: FunctionDescriptor) -> Self {
        let call = FunctionCall {
            name: function.name.clone(),
        };
        Self {
            messages,
            functions: Some(vec![function]),
            function_call: Some(call),
        }
    }

    /// Name of the forced function, if any
    pub fn forced_function(&self) -> Option<&str> {
        self.function_call.as_ref().map(|c| c.name.as_str())
    }
}

fn field_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern is valid")
    })
}

/// User message content for a free-text question
pub fn free_text_prompt(query: &str, matches: &[SentencePayload]) -> String {
    let context = matches
        .iter()
        .map(|m| m.title.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "{} \n\n\n ###Relevant parts of document: \n\n {}",
        query, context
    )
}

/// User message content for structured extraction
pub fn extraction_prompt(document_text: &str) -> String {
    format!("Extract the data from the document: \n\n {}", document_text)
}

/// Validate `fields` and build the `extract_data` descriptor
///
/// Rejects zero fields, empty or non-identifier names and duplicates.
pub fn extraction_function(fields: &[ExtractionField]) -> Result<FunctionDescriptor, ChatError> {
    if fields.is_empty() {
        return Err(ChatError::NoFields);
    }

    let mut seen = HashSet::new();
    for (position, field) in fields.iter().enumerate() {
        let name = field.name.trim();
        if name.is_empty() {
            return Err(ChatError::EmptyFieldName { position });
        }
        if !field_name_pattern().is_match(name) {
            return Err(ChatError::InvalidFieldName(name.to_string()));
        }
        if !seen.insert(name) {
            return Err(ChatError::DuplicateFieldName(name.to_string()));
        }
    }

    let properties = fields
        .iter()
        .map(|field| {
            (
                field.name.trim().to_string(),
                PropertySchema {
                    kind: "string".to_string(),
                    description: field.description.clone(),
                },
            )
        })
        .collect();

    Ok(FunctionDescriptor {
        name: EXTRACTION_FUNCTION_NAME.to_string(),
        description: EXTRACTION_FUNCTION_DESCRIPTION.to_string(),
        parameters: FunctionParameters {
            kind: "object".to_string(),
            properties,
            required: Vec::new(),
        },
    })
}

/// Append a free-text question with its retrieved context
pub fn assemble_free_text(
    conversation: &mut Conversation,
    query: &str,
    matches: &[SentencePayload],
) -> Result<ChatRequest, ChatError> {
    if query.trim().is_empty() {
        return Err(ChatError::EmptyQuery);
    }
    conversation.push(ChatRole::User, free_text_prompt(query, matches));
    Ok(ChatRequest::new(conversation.messages().to_vec()))
}

/// Append an extraction request over `document_text`
///
/// The fields are validated before anything is appended, so a rejected
/// request leaves the conversation untouched.
pub fn assemble_extraction(
    conversation: &mut Conversation,
    document_text: &str,
    fields: &[ExtractionField],
) -> Result<ChatRequest, ChatError> {
    let function = extraction_function(fields)?;
    conversation.push(ChatRole::User, extraction_prompt(document_text));
    Ok(ChatRequest::with_function(
        conversation.messages().to_vec(),
        function,
    ))
}
