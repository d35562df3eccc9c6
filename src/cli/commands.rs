// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::ExtractionField;
use crate::completion::OpenAiCompletionClient;
use crate::config::{NodeConfig, DEFAULT_TOP_K};
use crate::document::DocumentPage;
use crate::embeddings::{service::load_embedder, Embedder};
use crate::ocr::{ocr_document, PageImage, VlmTextRecognizer};
use crate::rag::RetrievalPipeline;
use crate::session::ChatSession;
use crate::storage::{DocumentStore, FileStore, MemoryStore};

/// Where the document pages come from
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// JSON file holding an array of {image, text} pages
    #[arg(long)]
    pub pages: Option<PathBuf>,

    /// File store directory; its "ocr" entry is used when --pages is absent
    #[arg(long, env = "STORAGE_DIR", default_value = "./data")]
    pub store_dir: PathBuf,
}

/// Arguments for the ocr command
#[derive(Args, Debug)]
pub struct OcrArgs {
    /// Page images, in page order
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// VLM sidecar base URL
    #[arg(long, env = "OCR_ENDPOINT")]
    pub endpoint: String,

    #[arg(long, env = "OCR_MODEL", default_value = "qwen3-vl")]
    pub model: String,

    /// Also write the pages to this JSON file
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, env = "STORAGE_DIR", default_value = "./data")]
    pub store_dir: PathBuf,
}

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the ask command
#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long)]
    pub query: String,

    /// Number of sentences to return
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub k: usize,
}

/// Arguments for the chat command
#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long)]
    pub query: String,

    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub k: usize,

    /// Completion API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Field to extract as name=description; repeatable
    #[arg(long = "field", required = true)]
    pub fields: Vec<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ExtractArgs {
    pub fn extraction_fields(&self) -> Result<Vec<ExtractionField>> {
        self.fields
            .iter()
            .map(|field| {
                let (name, description) = field.split_once('=').unwrap_or((field.as_str(), ""));
                let name = name.trim();
                if name.is_empty() {
                    bail!("field '{}' has no name", field);
                }
                Ok(ExtractionField::new(name, description.trim()))
            })
            .collect()
    }
}

fn node_config() -> Result<NodeConfig> {
    let config = NodeConfig::from_env().map_err(|e| anyhow!(e))?;
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

fn require_api_key(api_key: Option<String>) -> Result<String> {
    api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("no completion API key; pass --api-key or set OPENAI_API_KEY"))
}

async fn load_pages(source: &SourceArgs) -> Result<Vec<DocumentPage>> {
    let pages = match &source.pages {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<Vec<DocumentPage>>(&json)
                .with_context(|| format!("{} is not a page array", path.display()))?
        }
        None => {
            let store = DocumentStore::new(Arc::new(FileStore::new(&source.store_dir)));
            store.load_pages().await?
        }
    };
    if pages.is_empty() {
        warn!("Document has no pages");
    }
    Ok(pages)
}

async fn embedder(config: &NodeConfig) -> Result<Arc<dyn Embedder>> {
    let embedder = load_embedder(&config.embedding).await?;
    info!(
        "Embedding model {} ready ({} dimensions)",
        embedder.model_name(),
        embedder.dimension()
    );
    Ok(embedder)
}

async fn indexed_session(config: &NodeConfig, source: &SourceArgs) -> Result<ChatSession> {
    let pages = load_pages(source).await?;
    let session = ChatSession::new(
        "cli",
        embedder(config).await?,
        config.embedding.concurrency,
        DocumentStore::new(Arc::new(MemoryStore::new())),
    );
    session.index_pages(pages).await?;
    Ok(session)
}

pub async fn ocr(args: OcrArgs) -> Result<()> {
    let config = node_config()?;
    let recognizer =
        VlmTextRecognizer::new(&args.endpoint, &args.model, config.completion.timeout())?;

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let image = PageImage::from_bytes(bytes)
            .with_context(|| format!("{} is not a supported image", path.display()))?;
        images.push(image);
    }

    let pages = ocr_document(&images, &recognizer).await?;

    let store = DocumentStore::new(Arc::new(FileStore::new(&args.store_dir)));
    store.save_pages(&pages).await?;
    if let Some(out) = &args.out {
        tokio::fs::write(out, serde_json::to_string_pretty(&pages)?)
            .await
            .with_context(|| format!("failed to write {}", out.display()))?;
    }

    println!(
        "✅ Recognized {} pages into {}",
        pages.len(),
        args.store_dir.display()
    );
    Ok(())
}

pub async fn index(args: IndexArgs) -> Result<()> {
    let config = node_config()?;
    let pages = load_pages(&args.source).await?;
    let pipeline =
        RetrievalPipeline::with_concurrency(embedder(&config).await?, config.embedding.concurrency);
    let stats = pipeline.index_document(pages).await?;

    for unit in pipeline.sentence_units().await {
        println!("{}\t{}", unit.locator, unit.source_text);
    }
    println!(
        "✅ Indexed {} sentences from {} pages",
        stats.sentences, stats.pages
    );
    Ok(())
}

pub async fn ask(args: AskArgs) -> Result<()> {
    let config = node_config()?;
    let pages = load_pages(&args.source).await?;
    let pipeline =
        RetrievalPipeline::with_concurrency(embedder(&config).await?, config.embedding.concurrency);
    pipeline.index_document(pages).await?;

    let matches = pipeline.search(&args.query, args.k).await?;
    if matches.is_empty() {
        println!("No matching sentences");
    }
    for found in matches {
        println!(
            "{:.4}\t{}\t{}",
            found.score, found.payload.url, found.payload.title
        );
    }
    Ok(())
}

pub async fn chat(args: ChatArgs) -> Result<()> {
    let api_key = require_api_key(args.api_key)?;
    let config = node_config()?;
    let client = OpenAiCompletionClient::new(
        &config.completion.base_url,
        &config.completion.model,
        config.completion.timeout(),
    )?;
    let session = indexed_session(&config, &args.source).await?;

    let turn = session.ask(&args.query, args.k, &client, &api_key).await?;
    println!("{}", turn.reply);
    if !turn.context.is_empty() {
        println!();
        println!("Sources:");
        for sentence in &turn.context {
            println!("  [{}] {}", sentence.url, sentence.title);
        }
    }
    Ok(())
}

pub async fn extract(args: ExtractArgs) -> Result<()> {
    let fields = args.extraction_fields()?;
    let api_key = require_api_key(args.api_key.clone())?;
    let config = node_config()?;
    let client = OpenAiCompletionClient::new(
        &config.completion.base_url,
        &config.completion.model,
        config.completion.timeout(),
    )?;
    let session = indexed_session(&config, &args.source).await?;

    let result = session.extract(&fields, &client, &api_key).await?;
    println!("{}", serde_json::to_string_pretty(&result.data)?);
    Ok(())
}
