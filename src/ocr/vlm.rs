// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR through a VLM sidecar exposing an OpenAI-compatible API

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{PageImage, TextRecognizer};

const OCR_PROMPT: &str = "Extract all text from this image. Return only the extracted text, preserving the original layout and formatting as much as possible. If no text is found, respond with an empty string.";

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct VisionRequest {
    model: String,
    messages: Vec<VisionMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct VisionMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct VisionResponse {
    choices: Vec<VisionChoice>,
}

#[derive(serde::Deserialize)]
struct VisionChoice {
    message: VisionResponseMessage,
}

#[derive(serde::Deserialize)]
struct VisionResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text recognizer backed by a vision-language model
pub struct VlmTextRecognizer {
    client: Client,
    endpoint: String,
    model_name: String,
}

impl VlmTextRecognizer {
    pub fn new(endpoint: &str, model_name: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "VLM OCR configured: endpoint={}, model={}",
            endpoint, model_name
        );

        Ok(Self {
            client,
            endpoint,
            model_name: model_name.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Check if the VLM sidecar is healthy
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("VLM health check failed: {}", e);
                false
            }
        }
    }

    fn request(&self, image: &PageImage) -> VisionRequest {
        VisionRequest {
            model: self.model_name.clone(),
            messages: vec![VisionMessage {
                role: "user",
                content: serde_json::json!([
                    {"type": "text", "text": OCR_PROMPT},
                    {"type": "image_url", "image_url": {"url": image.to_data_url()}}
                ]),
            }],
            max_tokens: 4096,
            temperature: 0.1,
        }
    }
}

#[async_trait]
impl TextRecognizer for VlmTextRecognizer {
    async fn recognize_text(&self, image: &PageImage) -> Result<String> {
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&self.request(image))
            .send()
            .await?
            .error_for_status()?;

        let body: VisionResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(
            "VLM OCR: {}x{} page -> {} chars in {}ms",
            image.width(),
            image.height(),
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}
