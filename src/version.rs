// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the OCR chat node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-sentence-retrieval-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "sentence-segmentation",
    "onnx-embeddings",
    "hashing-embeddings",
    "exact-vector-search",
    "session-retrieval",
    "structured-extraction",
    "vlm-ocr",
    "chat-relay",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("OCR Chat Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
