// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-session document and chat endpoints under /v1/sessions/:id

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{
    chat_turn_handler, delete_session_handler, extract_handler, index_document_handler,
    messages_handler, ocr_document_handler, retrieve_handler,
};
pub use request::{
    ChatTurnRequest, ExtractRequest, IndexDocumentRequest, OcrImagesRequest, RetrieveRequest,
};
pub use response::{ChatTurnResponse, MessagesResponse, OcrIngestResponse, RetrieveResponse};
