// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Confab.
//!
//! Serves the SSE chat endpoint that streams a turn's live branch to the
//! client, a read API over conversation histories, and a health probe.
//! A client disconnect cancels the turn's governing token, so the
//! background branch commits what it has.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, start_server, GatewayState, ServerConfig};
