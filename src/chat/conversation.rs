// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Append-only conversation history

use serde::{Deserialize, Serialize};

/// Instruction that opens every conversation
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that answer questions based on relevant parts of a document. When user asks you a questions, it will be provided with relevant parts of document, if you don't find the answer on the document just answer with \"I couldn't find it on your document\" and the user will be able to ask another question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Position in the conversation, as a string
    #[serde(default)]
    pub id: String,
    pub role: ChatRole,
    pub content: String,
}

/// Ordered chat history whose first message is [`SYSTEM_PROMPT`]
///
/// Messages can only be appended; nothing already pushed is ever rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage {
                id: "0".to_string(),
                role: ChatRole::System,
                content: SYSTEM_PROMPT.to_string(),
            }],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append a message; its id is its position
    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) -> &ChatMessage {
        let id = self.messages.len().to_string();
        self.messages.push(ChatMessage {
            id,
            role,
            content: content.into(),
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system prompt is present from the start
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
