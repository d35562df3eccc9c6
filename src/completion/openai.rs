// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat completion client for OpenAI-compatible APIs

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{CompletionClient, CompletionError, CompletionOutput};
use crate::chat::{ChatRequest, ChatRole, FunctionCall, FunctionDescriptor};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo-0613";

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionDescriptor]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'a FunctionCall>,
}

#[derive(serde::Serialize)]
struct WireMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(serde::Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(serde::Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
}

#[derive(serde::Deserialize)]
struct WireFunctionCall {
    arguments: String,
}

#[derive(serde::Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(serde::Deserialize)]
struct WireErrorDetail {
    message: String,
}

/// Client for `POST {base_url}/v1/chat/completions`
pub struct OpenAiCompletionClient {
    client: Client,
    base_url: String,
    model_name: String,
}

impl OpenAiCompletionClient {
    pub fn new(base_url: &str, model_name: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            "Completion client configured: endpoint={}, model={}",
            base_url, model_name
        );

        Ok(Self {
            client,
            base_url,
            model_name: model_name.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wire_request<'a>(&'a self, request: &'a ChatRequest) -> WireRequest<'a> {
        WireRequest {
            model: &self.model_name,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            functions: request.functions.as_deref(),
            function_call: request.function_call.as_ref(),
        }
    }
}

/// Message for a non-success upstream status
fn upstream_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<WireErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown").to_string())
}

fn parse_output(body: WireResponse) -> Result<CompletionOutput, CompletionError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Decode("response has no choices".to_string()))?;

    match (choice.message.function_call, choice.message.content) {
        (Some(call), _) => Ok(CompletionOutput::FunctionArguments(call.arguments)),
        (None, Some(content)) => Ok(CompletionOutput::Text(content)),
        (None, None) => Err(CompletionError::Decode(
            "message has neither content nor function_call".to_string(),
        )),
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> Result<CompletionOutput, CompletionError> {
        if credential.trim().is_empty() {
            return Err(CompletionError::MissingCredential);
        }

        let start = Instant::now();
        debug!(
            "Sending {} messages to {} (function: {:?})",
            request.messages.len(),
            self.model_name,
            request.forced_function()
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(credential.trim())
            .json(&self.wire_request(request))
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(status, &body);
            warn!("Completion endpoint returned {}: {}", status, message);
            return Err(CompletionError::UpstreamStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;
        let output = parse_output(body)?;

        info!(
            "Completion finished in {}ms ({} chars)",
            start.elapsed().as_millis(),
            output.as_str().len()
        );
        Ok(output)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
