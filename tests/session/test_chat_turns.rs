// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Retrieval-augmented chat turns against a scripted completion client

use async_trait::async_trait;
use ocr_chat_node::chat::{ChatRequest, ChatRole, SYSTEM_PROMPT};
use ocr_chat_node::completion::{CompletionClient, CompletionError, CompletionOutput};
use ocr_chat_node::document::DocumentPage;
use ocr_chat_node::embeddings::{Embedder, HashingEmbedder};
use ocr_chat_node::session::{ChatSession, SessionError};
use ocr_chat_node::storage::{DocumentStore, MemoryStore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays queued outputs and records every request it receives
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<CompletionOutput, CompletionError>>>,
    requests: Mutex<Vec<(ChatRequest, String)>>,
}

impl ScriptedClient {
    fn with(replies: Vec<Result<CompletionOutput, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(ChatRequest, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> Result<CompletionOutput, CompletionError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), credential.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Transport("no scripted reply".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

async fn paris_session() -> ChatSession {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384).unwrap());
    let session = ChatSession::new(
        "test",
        embedder,
        4,
        DocumentStore::new(Arc::new(MemoryStore::new())),
    );
    session
        .index_pages(vec![DocumentPage::from_text(
            "Paris is the capital of France. It has a population of over 2 million. \
             The Eiffel Tower is a famous landmark.",
        )])
        .await
        .unwrap();
    session
}

#[tokio::test]
async fn test_turn_sends_history_with_context() {
    let session = paris_session().await;
    let client = ScriptedClient::with(vec![Ok(CompletionOutput::Text("Paris.".to_string()))]);

    let turn = session
        .ask("What is the capital of France?", 1, &client, "sk-test")
        .await
        .unwrap();
    assert_eq!(turn.reply, "Paris.");
    assert_eq!(turn.context[0].title, "Paris is the capital of France.");

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let (request, credential) = &requests[0];
    assert_eq!(credential, "sk-test");
    assert!(request.functions.is_none());
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, ChatRole::System);
    assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
    assert_eq!(
        request.messages[1].content,
        "What is the capital of France? \n\n\n ###Relevant parts of document: \n\n \
         Paris is the capital of France."
    );

    let messages = session.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].role, ChatRole::Assistant);
    assert_eq!(messages[2].content, "Paris.");
}

#[tokio::test]
async fn test_history_grows_across_turns() {
    let session = paris_session().await;
    let client = ScriptedClient::with(vec![
        Ok(CompletionOutput::Text("Paris.".to_string())),
        Ok(CompletionOutput::Text("Over 2 million.".to_string())),
    ]);

    session
        .ask("What is the capital of France?", 1, &client, "sk")
        .await
        .unwrap();
    session
        .ask("How many people live there?", 1, &client, "sk")
        .await
        .unwrap();

    let requests = client.requests();
    assert_eq!(requests[1].0.messages.len(), 4);
    assert_eq!(requests[1].0.messages[2].content, "Paris.");

    let messages = session.messages().await;
    assert_eq!(messages.len(), 5);
    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_failed_completion_leaves_history_unchanged() {
    let session = paris_session().await;
    let client = ScriptedClient::with(vec![Err(CompletionError::UpstreamStatus {
        status: 429,
        message: "Too Many Requests".to_string(),
    })]);

    let result = session
        .ask("What is the capital of France?", 1, &client, "sk")
        .await;
    assert!(matches!(
        result,
        Err(SessionError::Completion(CompletionError::UpstreamStatus { status: 429, .. }))
    ));
    assert_eq!(session.messages().await.len(), 1);
}

#[tokio::test]
async fn test_empty_question_is_rejected_before_completion() {
    let session = paris_session().await;
    let client = ScriptedClient::default();

    let result = session.ask("   ", 5, &client, "sk").await;
    assert!(matches!(result, Err(SessionError::Chat(_))));
    assert!(client.requests().is_empty());
    assert_eq!(session.messages().await.len(), 1);
}

#[tokio::test]
async fn test_question_without_document() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384).unwrap());
    let session = ChatSession::new(
        "empty",
        embedder,
        4,
        DocumentStore::new(Arc::new(MemoryStore::new())),
    );
    let client = ScriptedClient::with(vec![Ok(CompletionOutput::Text(
        "I couldn't find it on your document".to_string(),
    ))]);

    let turn = session.ask("Anything?", 5, &client, "sk").await.unwrap();
    assert!(turn.context.is_empty());
    assert_eq!(
        client.requests()[0].0.messages[1].content,
        "Anything? \n\n\n ###Relevant parts of document: \n\n "
    );
}
