// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// End-to-end retrieval over OCR'd pages with the hashing embedder

use ocr_chat_node::document::DocumentPage;
use ocr_chat_node::embeddings::{Embedder, HashingEmbedder};
use ocr_chat_node::rag::RetrievalPipeline;
use std::sync::Arc;

fn pipeline() -> RetrievalPipeline {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384).unwrap());
    RetrievalPipeline::new(embedder)
}

fn paris_document() -> Vec<DocumentPage> {
    vec![DocumentPage::new(
        "data:image/png;base64,AAAA",
        "Paris is the capital of France. It has a population of over 2 million. \
         The Eiffel Tower is a famous landmark.",
    )]
}

#[tokio::test]
async fn test_capital_question_finds_paris_sentence() {
    let pipeline = pipeline();
    let stats = pipeline.index_document(paris_document()).await.unwrap();
    assert_eq!(stats.pages, 1);
    assert_eq!(stats.sentences, 3);
    assert_eq!(stats.dimension, Some(384));

    let results = pipeline
        .retrieve("What is the capital of France?", 1)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Paris is the capital of France.");
    assert_eq!(results[0].url, "/text/1/sentence/0");
}

#[tokio::test]
async fn test_two_page_document_ranks_first_page() {
    let pipeline = pipeline();
    let stats = pipeline
        .index_document(vec![
            DocumentPage::from_text("Paris is the capital of France."),
            DocumentPage::from_text("It has a population of over 2 million."),
        ])
        .await
        .unwrap();
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.sentences, 2);

    let results = pipeline
        .retrieve("What is the capital of France?", 2)
        .await
        .unwrap();
    let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["/text/1/sentence/0", "/text/2/sentence/0"]);
    assert_eq!(results[0].title, "Paris is the capital of France.");

    let top = pipeline
        .retrieve("What is the capital of France?", 1)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].url, "/text/1/sentence/0");
}

#[tokio::test]
async fn test_units_follow_page_and_sentence_order() {
    let pipeline = pipeline();
    pipeline
        .index_document(vec![
            DocumentPage::from_text("First page one. First page two."),
            DocumentPage::from_text(""),
            DocumentPage::from_text("Third page one."),
        ])
        .await
        .unwrap();

    let locators: Vec<String> = pipeline
        .sentence_units()
        .await
        .into_iter()
        .map(|u| u.locator)
        .collect();
    assert_eq!(
        locators,
        vec![
            "/text/1/sentence/0",
            "/text/1/sentence/1",
            "/text/3/sentence/0"
        ]
    );
}

#[tokio::test]
async fn test_every_sentence_retrieves_itself_first() {
    let pipeline = pipeline();
    pipeline.index_document(paris_document()).await.unwrap();

    for unit in pipeline.sentence_units().await {
        let results = pipeline.search(&unit.source_text, 1).await.unwrap();
        assert_eq!(results[0].id, unit.id);
        assert!((results[0].score - 1.0).abs() < 1e-4);
    }
}

#[tokio::test]
async fn test_k_larger_than_document() {
    let pipeline = pipeline();
    pipeline.index_document(paris_document()).await.unwrap();

    let results = pipeline.search("Paris", 10).await.unwrap();
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_k_zero_and_blank_query() {
    let pipeline = pipeline();
    pipeline.index_document(paris_document()).await.unwrap();

    assert!(pipeline.retrieve("Paris", 0).await.unwrap().is_empty());
    assert!(pipeline.retrieve("   ", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_document() {
    let pipeline = pipeline();
    let stats = pipeline.index_document(Vec::new()).await.unwrap();
    assert_eq!(stats.sentences, 0);
    assert_eq!(stats.dimension, None);
    assert!(pipeline.retrieve("anything", 5).await.unwrap().is_empty());

    let stats = pipeline
        .index_document(vec![DocumentPage::from_text("  \n\n ... | ")])
        .await
        .unwrap();
    assert_eq!(stats.sentences, 0);
    assert!(pipeline.retrieve("anything", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retrieve_before_indexing() {
    let pipeline = pipeline();
    assert!(pipeline.index_stats().await.is_none());
    assert!(pipeline.retrieve("Paris", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_identical_sentences_both_returned() {
    let pipeline = pipeline();
    pipeline
        .index_document(vec![
            DocumentPage::from_text("Total due is 40 euros."),
            DocumentPage::from_text("Total due is 40 euros."),
        ])
        .await
        .unwrap();

    let results = pipeline.retrieve("Total due is 40 euros.", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "/text/1/sentence/0");
    assert_eq!(results[1].url, "/text/2/sentence/0");
}

#[tokio::test]
async fn test_document_text_joins_pages() {
    let pipeline = pipeline();
    pipeline
        .index_document(vec![
            DocumentPage::from_text("Page one."),
            DocumentPage::from_text("Page two."),
        ])
        .await
        .unwrap();

    assert_eq!(pipeline.document_text().await, "Page one.\n\nPage two.");
    assert_eq!(pipeline.pages().await.len(), 2);
}
