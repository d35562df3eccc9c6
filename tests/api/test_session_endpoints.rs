// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// /v1/sessions/:id endpoints driven through the router

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use ocr_chat_node::api::{create_app, AppState};
use ocr_chat_node::chat::ChatRequest;
use ocr_chat_node::completion::{CompletionClient, CompletionError, CompletionOutput};
use ocr_chat_node::embeddings::{Embedder, EmbeddingService, HashingEmbedder};
use ocr_chat_node::ocr::{PageImage, TextRecognizer};
use ocr_chat_node::session::SessionManager;
use ocr_chat_node::storage::{KeyValueStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// 1x1 PNG
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

/// Echoes the credential back, or returns function arguments when forced
#[derive(Default)]
struct EchoClient {
    credentials: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> Result<CompletionOutput, CompletionError> {
        self.credentials.lock().unwrap().push(credential.to_string());
        match request.forced_function() {
            Some(_) => Ok(CompletionOutput::FunctionArguments(
                r#"{"capital": "Paris"}"#.to_string(),
            )),
            None => Ok(CompletionOutput::Text(format!("answered with {}", credential))),
        }
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

/// Returns the same text for every page
struct FixedRecognizer(&'static str);

#[async_trait]
impl TextRecognizer for FixedRecognizer {
    async fn recognize_text(&self, _image: &PageImage) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
}

fn harness(recognizer: Option<Arc<dyn TextRecognizer>>) -> Harness {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384).unwrap());
    let store = Arc::new(MemoryStore::new());
    let app = create_app(AppState {
        sessions: Arc::new(SessionManager::new(
            EmbeddingService::ready(embedder),
            store.clone(),
            4,
        )),
        completion: Arc::new(EchoClient::default()),
        recognizer,
        top_k: 5,
    });
    Harness { app, store }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn index_paris(app: &Router, session: &str) {
    let (status, body) = call(
        app,
        Method::POST,
        &format!("/v1/sessions/{}/documents", session),
        None,
        Some(json!({
            "pages": [{
                "image": "",
                "text": "Paris is the capital of France. The Eiffel Tower is a famous landmark."
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sentences"], 2);
}

#[tokio::test]
async fn test_index_then_retrieve() {
    let h = harness(None);
    index_paris(&h.app, "s1").await;

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/retrieve",
        None,
        Some(json!({"query": "What is the capital of France?", "k": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"matches": [{
            "title": "Paris is the capital of France.",
            "url": "/text/1/sentence/0"
        }]})
    );

    // pages are persisted under the session
    assert!(h.store.get("sessions/s1/ocr").await.unwrap().is_some());
}

#[tokio::test]
async fn test_sessions_do_not_share_documents() {
    let h = harness(None);
    index_paris(&h.app, "s1").await;

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s2/retrieve",
        None,
        Some(json!({"query": "Paris"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matches": []}));
}

#[tokio::test]
async fn test_chat_requires_credential() {
    let h = harness(None);
    index_paris(&h.app, "s1").await;

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/chat",
        None,
        Some(json!({"message": "What is the capital of France?"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_type"], "unauthorized");
}

#[tokio::test]
async fn test_chat_turn_and_history() {
    let h = harness(None);
    index_paris(&h.app, "s1").await;

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/chat",
        Some("openai-api-key=sk-user"),
        Some(json!({"message": "What is the capital of France?", "k": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "answered with sk-user");
    assert_eq!(body["context"][0]["url"], "/text/1/sentence/0");
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(body["messages"][2]["role"], "assistant");

    let (status, body) = call(&h.app, Method::GET, "/v1/sessions/s1/messages", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(body["messages"][0]["role"], "system");
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let h = harness(None);
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/chat",
        Some("openai-api-key=sk-user"),
        Some(json!({"message": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "message");
}

#[tokio::test]
async fn test_extract_endpoint() {
    let h = harness(None);
    index_paris(&h.app, "s1").await;

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/extract",
        Some("openai-api-key=sk-user"),
        Some(json!({"fields": [{"name": "capital", "description": "Capital city"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"capital": "Paris"}));
    assert_eq!(body["raw"], r#"{"capital": "Paris"}"#);
}

#[tokio::test]
async fn test_extract_invalid_field_name() {
    let h = harness(None);
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/extract",
        Some("openai-api-key=sk-user"),
        Some(json!({"fields": [{"name": "total amount", "description": ""}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
}

#[tokio::test]
async fn test_messages_of_unknown_session() {
    let h = harness(None);
    let (status, body) = call(&h.app, Method::GET, "/v1/sessions/nope/messages", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_delete_session() {
    let h = harness(None);
    index_paris(&h.app, "s1").await;

    let (status, _) = call(&h.app, Method::DELETE, "/v1/sessions/s1", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.store.get("sessions/s1/ocr").await.unwrap().is_none());

    let (status, _) = call(&h.app, Method::DELETE, "/v1/sessions/s1", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_session_id() {
    let h = harness(None);
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/bad%20id/retrieve",
        None,
        Some(json!({"query": "Paris"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "id");
}

#[tokio::test]
async fn test_ocr_without_recognizer() {
    let h = harness(None);
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/ocr",
        None,
        Some(json!({"images": [TINY_PNG_BASE64]})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "service_unavailable");
}

#[tokio::test]
async fn test_ocr_indexes_recognized_pages() {
    let h = harness(Some(Arc::new(FixedRecognizer(
        "Paris is the capital of France.",
    ))));

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/ocr",
        None,
        Some(json!({
            "images": [
                TINY_PNG_BASE64,
                format!("data:image/png;base64,{}", TINY_PNG_BASE64)
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pages"].as_array().unwrap().len(), 2);
    assert!(body["pages"][0]["image"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert_eq!(body["stats"]["sentences"], 2);

    let (_, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/retrieve",
        None,
        Some(json!({"query": "capital of France", "k": 5})),
    )
    .await;
    let urls: Vec<&str> = body["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, vec!["/text/1/sentence/0", "/text/2/sentence/0"]);
}

#[tokio::test]
async fn test_ocr_rejects_undecodable_image() {
    let h = harness(Some(Arc::new(FixedRecognizer("text"))));
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/v1/sessions/s1/ocr",
        None,
        Some(json!({"images": ["not an image!"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "images[0]");
}
