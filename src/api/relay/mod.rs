// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Completion relay endpoint module
//!
//! Provides POST /api/chat, which forwards a prepared message list to the
//! completion API with the caller's own credential.

pub mod handler;
pub mod request;

pub use handler::relay_chat_handler;
pub use request::RelayRequest;
