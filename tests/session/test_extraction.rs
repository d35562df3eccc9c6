// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Structured extraction through a forced extract_data call

use async_trait::async_trait;
use ocr_chat_node::chat::{ChatError, ChatRequest, ChatRole, ExtractionField};
use ocr_chat_node::completion::{CompletionClient, CompletionError, CompletionOutput};
use ocr_chat_node::document::DocumentPage;
use ocr_chat_node::embeddings::{Embedder, HashingEmbedder};
use ocr_chat_node::session::{ChatSession, SessionError};
use ocr_chat_node::storage::{DocumentStore, MemoryStore};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Always answers with the same output and keeps the last request
struct FixedClient {
    output: CompletionOutput,
    last: Mutex<Option<ChatRequest>>,
}

impl FixedClient {
    fn new(output: CompletionOutput) -> Self {
        Self {
            output,
            last: Mutex::new(None),
        }
    }

    fn last_request(&self) -> Option<ChatRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FixedClient {
    async fn complete(
        &self,
        request: &ChatRequest,
        _credential: &str,
    ) -> Result<CompletionOutput, CompletionError> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(self.output.clone())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

async fn invoice_session() -> ChatSession {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(128).unwrap());
    let session = ChatSession::new(
        "invoice",
        embedder,
        2,
        DocumentStore::new(Arc::new(MemoryStore::new())),
    );
    session
        .index_pages(vec![
            DocumentPage::from_text("Invoice 2024-117. Total: 40 EUR."),
            DocumentPage::from_text("Due by 1 March."),
        ])
        .await
        .unwrap();
    session
}

fn fields() -> Vec<ExtractionField> {
    vec![
        ExtractionField::new("total", "Invoice total"),
        ExtractionField::new("due_date", "Payment due date"),
    ]
}

#[tokio::test]
async fn test_extraction_forces_function_over_whole_document() {
    let session = invoice_session().await;
    let raw = r#"{"total": "40 EUR", "due_date": "1 March"}"#;
    let client = FixedClient::new(CompletionOutput::FunctionArguments(raw.to_string()));

    let result = session.extract(&fields(), &client, "sk").await.unwrap();
    assert_eq!(result.data, json!({"total": "40 EUR", "due_date": "1 March"}));
    assert_eq!(result.raw, raw);

    let request = client.last_request().unwrap();
    assert_eq!(request.forced_function(), Some("extract_data"));
    assert_eq!(
        request.messages.last().unwrap().content,
        "Extract the data from the document: \n\n \
         Invoice 2024-117. Total: 40 EUR.\n\nDue by 1 March."
    );

    let wire = serde_json::to_value(&request).unwrap();
    assert_eq!(wire["function_call"], json!({"name": "extract_data"}));
    assert_eq!(wire["functions"][0]["description"], "Extract data from document");
    assert_eq!(
        wire["functions"][0]["parameters"]["properties"]["due_date"],
        json!({"type": "string", "description": "Payment due date"})
    );
    assert!(wire["functions"][0]["parameters"].get("required").is_none());

    let messages = session.messages().await;
    assert_eq!(messages.last().unwrap().role, ChatRole::Assistant);
    assert_eq!(messages.last().unwrap().content, raw);
}

#[tokio::test]
async fn test_invalid_fields_rejected_without_call() {
    let session = invoice_session().await;
    let client = FixedClient::new(CompletionOutput::FunctionArguments("{}".to_string()));

    let result = session
        .extract(
            &[
                ExtractionField::new("total", "a"),
                ExtractionField::new("total", "b"),
            ],
            &client,
            "sk",
        )
        .await;
    assert!(matches!(
        result,
        Err(SessionError::Chat(ChatError::DuplicateFieldName(_)))
    ));
    assert!(client.last_request().is_none());
    assert_eq!(session.messages().await.len(), 1);
}

#[tokio::test]
async fn test_plain_text_answer_is_an_error() {
    let session = invoice_session().await;
    let client = FixedClient::new(CompletionOutput::Text("The total is 40 EUR".to_string()));

    let result = session.extract(&fields(), &client, "sk").await;
    assert!(matches!(
        result,
        Err(SessionError::Completion(CompletionError::Decode(_)))
    ));
    assert_eq!(session.messages().await.len(), 1);
}

#[tokio::test]
async fn test_malformed_arguments_are_not_fabricated() {
    let session = invoice_session().await;

    for raw in [r#"{"total": "40"#, r#"["40 EUR"]"#] {
        let client = FixedClient::new(CompletionOutput::FunctionArguments(raw.to_string()));
        let result = session.extract(&fields(), &client, "sk").await;
        assert!(matches!(result, Err(SessionError::InvalidExtraction(_))));
    }
    assert_eq!(session.messages().await.len(), 1);
}
