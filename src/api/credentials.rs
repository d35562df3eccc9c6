// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Completion credential lookup

use axum::http::{header, HeaderMap};

/// Cookie carrying the caller's completion API key
pub const CREDENTIAL_COOKIE: &str = "openai-api-key";

/// Read the completion credential from the request headers
///
/// The `openai-api-key` cookie wins over an `Authorization: Bearer` header.
/// Blank values count as absent.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_credential(headers).or_else(|| bearer_credential(headers))
}

fn cookie_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CREDENTIAL_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
