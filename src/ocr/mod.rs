// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR collaborators
//!
//! Turns page images (or a PDF, through a [`PageRasterizer`]) into
//! [`DocumentPage`]s. Recognition runs page by page in order; the first
//! failure aborts the whole document.

pub mod page_image;
pub mod vlm;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::DocumentPage;

pub use page_image::{detect_format, ImageError, PageImage, MAX_IMAGE_SIZE};
pub use vlm::VlmTextRecognizer;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Page {page}: {source}")]
    Image {
        page: usize,
        #[source]
        source: ImageError,
    },

    /// The recognizer failed on a page
    #[error("Text recognition failed on page {page}: {message}")]
    Recognition { page: usize, message: String },

    #[error("PDF rasterization failed: {0}")]
    Rasterization(String),
}

/// Extracts plain text from one page image
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Best-effort text; no accuracy guarantee
    async fn recognize_text(&self, image: &PageImage) -> anyhow::Result<String>;
}

/// Renders every page of a PDF to an image
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn render_pages(&self, pdf: &[u8]) -> anyhow::Result<Vec<PageImage>>;
}

/// Parse image references (data URLs or bare base64), one per page
pub fn parse_page_images<S: AsRef<str>>(references: &[S]) -> Result<Vec<PageImage>, OcrError> {
    references
        .iter()
        .enumerate()
        .map(|(page, reference)| {
            PageImage::parse(reference.as_ref()).map_err(|source| OcrError::Image { page, source })
        })
        .collect()
}

/// Run OCR over `images` in page order
pub async fn ocr_document(
    images: &[PageImage],
    recognizer: &dyn TextRecognizer,
) -> Result<Vec<DocumentPage>, OcrError> {
    info!("Running OCR on {} pages", images.len());

    let mut pages = Vec::with_capacity(images.len());
    for (page, image) in images.iter().enumerate() {
        let text = recognizer
            .recognize_text(image)
            .await
            .map_err(|e| OcrError::Recognition {
                page,
                message: format!("{:#}", e),
            })?;
        debug!("Page {}: {} chars recognized", page, text.len());
        pages.push(DocumentPage::new(image.to_data_url(), text));
    }

    Ok(pages)
}

/// Rasterize a PDF and OCR every page
pub async fn ocr_pdf(
    pdf: &[u8],
    rasterizer: &dyn PageRasterizer,
    recognizer: &dyn TextRecognizer,
) -> Result<Vec<DocumentPage>, OcrError> {
    let images = rasterizer
        .render_pages(pdf)
        .await
        .map_err(|e| OcrError::Rasterization(format!("{:#}", e)))?;
    ocr_document(&images, recognizer).await
}
