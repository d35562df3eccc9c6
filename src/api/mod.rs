// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod credentials;
pub mod errors;
pub mod http_server;
pub mod relay;
pub mod sessions;

pub use credentials::{credential_from_headers, CREDENTIAL_COOKIE};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_app, start_server, AppState, HealthResponse};
pub use relay::{relay_chat_handler, RelayRequest};
pub use sessions::{
    ChatTurnRequest, ChatTurnResponse, ExtractRequest, IndexDocumentRequest, MessagesResponse,
    OcrImagesRequest, OcrIngestResponse, RetrieveRequest, RetrieveResponse,
};
