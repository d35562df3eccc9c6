// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use ocr_chat_node::{
    api::{start_server, AppState},
    completion::{CompletionClient, OpenAiCompletionClient},
    config::NodeConfig,
    embeddings::{service::load_embedder, EmbeddingService},
    ocr::{TextRecognizer, VlmTextRecognizer},
    session::SessionManager,
    storage::{FileStore, KeyValueStore},
};
use std::{env, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting OCR chat node...\n");
    println!("📦 {}", ocr_chat_node::version::get_version_string());
    println!("🔖 Build: {}", ocr_chat_node::version::VERSION);
    println!("✨ Features: {}", ocr_chat_node::version::FEATURES.join(", "));
    println!();

    let config = NodeConfig::from_env().map_err(|e| anyhow!(e))?;
    config.validate().map_err(|e| anyhow!(e))?;
    let addr = config.listen_addr().map_err(|e| anyhow!(e))?;

    // Load the embedding model in the background; requests wait for it
    println!(
        "🧠 Loading embedding model ({:?}, {})...",
        config.embedding.backend, config.embedding.model_repo
    );
    let embeddings = EmbeddingService::new();
    let embedding_config = config.embedding.clone();
    embeddings.start_loading(move || async move { load_embedder(&embedding_config).await });

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.storage_dir));
    println!("💾 Document store: {}", config.storage_dir.display());

    let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiCompletionClient::new(
        &config.completion.base_url,
        &config.completion.model,
        config.completion.timeout(),
    )?);
    println!(
        "💬 Completion API: {} ({})",
        config.completion.base_url, config.completion.model
    );

    let recognizer: Option<Arc<dyn TextRecognizer>> = match &config.ocr.endpoint {
        Some(endpoint) => {
            let client =
                VlmTextRecognizer::new(endpoint, &config.ocr.model, config.completion.timeout())?;
            if !client.health_check().await {
                tracing::warn!("OCR endpoint {} is not answering yet", endpoint);
            }
            println!("👁️  OCR: {} ({})", endpoint, config.ocr.model);
            Some(Arc::new(client))
        }
        None => {
            println!("👁️  OCR: disabled (set OCR_ENDPOINT to enable)");
            None
        }
    };

    let state = AppState {
        sessions: Arc::new(SessionManager::new(
            embeddings,
            store,
            config.embedding.concurrency,
        )),
        completion,
        recognizer,
        top_k: config.retrieval_top_k,
    };

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(addr, state).await {
            tracing::error!("API server error: {}", e);
        }
    });

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("API endpoints:");
    println!("  Health:    GET  http://{}/health", addr);
    println!("  Relay:     POST http://{}/api/chat", addr);
    println!("  Documents: POST http://{}/v1/sessions/:id/documents", addr);
    println!("  Chat:      POST http://{}/v1/sessions/:id/chat", addr);
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    // Wait for shutdown signal
    signal::ctrl_c().await?;

    println!("\n⏹️  Shutting down...");
    server_handle.abort();

    println!("👋 Goodbye!");
    Ok(())
}
