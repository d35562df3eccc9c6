// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// OCR chat node CLI
#[derive(Parser, Debug)]
#[command(name = "ocr-chat-cli")]
#[command(version)]
#[command(about = "Index OCR'd documents and chat with them from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize page images and store the pages
    Ocr(commands::OcrArgs),

    /// Split a stored document into sentence units and index it
    Index(commands::IndexArgs),

    /// Print the sentences closest to a query
    Ask(commands::AskArgs),

    /// Answer a question from the document through the completion API
    Chat(commands::ChatArgs),

    /// Extract named fields from the document through the completion API
    Extract(commands::ExtractArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ocr(args) => commands::ocr(args).await,
        Commands::Index(args) => commands::index(args).await,
        Commands::Ask(args) => commands::ask(args).await,
        Commands::Chat(args) => commands::chat(args).await,
        Commands::Extract(args) => commands::extract(args).await,
    }
}
