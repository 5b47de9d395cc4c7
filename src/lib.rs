// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! DevArena Server - Clerk authentication for the DevArena API
//!
//! Establishes trust in untrusted input before any business logic runs:
//! Clerk session tokens on API requests, and Svix signatures on Clerk
//! webhook deliveries.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Clerk session token verification
//! - `webhooks` - Webhook signature verification and event dispatch
//! - `storage` - User repository (redb or in-memory)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;
pub mod storage;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod testutil;
