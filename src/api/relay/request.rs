// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relay request body

use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatRequest, FunctionDescriptor};

/// Body of POST /api/chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,

    /// Function the model must call
    #[serde(default, rename = "fn")]
    pub function: Option<FunctionDescriptor>,
}

impl RelayRequest {
    /// Build the completion request, or `None` when no messages were sent
    pub fn into_chat_request(self) -> Option<ChatRequest> {
        let messages = self.messages?;
        Some(match self.function {
            Some(function) => ChatRequest::with_function(messages, function),
            None => ChatRequest::new(messages),
        })
    }
}
