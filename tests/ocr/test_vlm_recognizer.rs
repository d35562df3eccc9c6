// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// VlmTextRecognizer against a local fake VLM sidecar

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use ocr_chat_node::ocr::{ocr_document, OcrError, PageImage, TextRecognizer, VlmTextRecognizer};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

#[derive(Clone)]
struct FakeSidecar {
    status: StatusCode,
    reply: Value,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn completions(
    State(sidecar): State<FakeSidecar>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    sidecar.seen.lock().unwrap().push(body);
    (sidecar.status, Json(sidecar.reply.clone()))
}

async fn health() -> &'static str {
    "ok"
}

async fn spawn_sidecar(status: StatusCode, reply: Value) -> (SocketAddr, FakeSidecar) {
    let sidecar = FakeSidecar {
        status,
        reply,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/chat/completions", post(completions))
        .with_state(sidecar.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, sidecar)
}

fn recognizer(addr: SocketAddr) -> VlmTextRecognizer {
    // Trailing slash is tolerated
    VlmTextRecognizer::new(
        &format!("http://{}/", addr),
        "qwen3-vl",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_recognized_text_returned() {
    let (addr, sidecar) = spawn_sidecar(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "INVOICE\nTotal: 42 EUR"}}]}),
    )
    .await;

    let image = PageImage::from_base64(TINY_PNG_BASE64).unwrap();
    let text = recognizer(addr).recognize_text(&image).await.unwrap();
    assert_eq!(text, "INVOICE\nTotal: 42 EUR");

    let seen = sidecar.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["model"], "qwen3-vl");
    let content = &seen[0]["messages"][0]["content"];
    assert_eq!(content[0]["type"], "text");
    assert_eq!(content[1]["type"], "image_url");
    assert_eq!(content[1]["image_url"]["url"], image.to_data_url());
}

#[tokio::test]
async fn test_no_choices_is_empty_text() {
    let (addr, _) = spawn_sidecar(StatusCode::OK, json!({"choices": []})).await;
    let image = PageImage::from_base64(TINY_PNG_BASE64).unwrap();
    assert_eq!(recognizer(addr).recognize_text(&image).await.unwrap(), "");
}

#[tokio::test]
async fn test_sidecar_error_fails_page() {
    let (addr, _) = spawn_sidecar(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "model crashed"}),
    )
    .await;

    let image = PageImage::from_base64(TINY_PNG_BASE64).unwrap();
    let result = ocr_document(&[image], &recognizer(addr)).await;
    assert!(matches!(result, Err(OcrError::Recognition { page: 0, .. })));
}

#[tokio::test]
async fn test_health_check() {
    let (addr, _) = spawn_sidecar(StatusCode::OK, json!({})).await;
    let recognizer = recognizer(addr);
    assert_eq!(recognizer.endpoint(), format!("http://{}", addr));
    assert!(recognizer.health_check().await);
}
