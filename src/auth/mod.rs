// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! # Authentication Module
//!
//! Clerk session token authentication for the DevArena API.
//!
//! ## Auth Flow
//!
//! 1. Frontend (Next.js) authenticates the user with Clerk
//! 2. Frontend sends `Authorization: Bearer <Clerk JWT>` (cross-origin) or
//!    relies on the `__session` cookie (same-origin)
//! 3. Server:
//!    - Verifies the RSA signature against the instance's PEM public key
//!    - Checks `exp`/`nbf`, the `azp` allow-list and membership status
//!    - Attaches `sub` → `user_id`, `sid` → `session_id` and the full claims
//!      to the request as an [`AuthContext`]
//!
//! ## Security
//!
//! - The header `alg` is pinned to the RSA family; `none` and HMAC are refused
//! - The key is static configuration; nothing is fetched at request time
//! - Verification is stateless and never retried

pub mod claims;
pub mod error;
pub mod extractor;
pub mod keys;
pub mod middleware;
pub mod parties;
pub mod verifier;

pub use claims::{AuthContext, ClerkClaims};
pub use error::AuthError;
pub use extractor::{Auth, DEFAULT_SESSION_COOKIE};
pub use keys::{KeyError, SigningKey};
pub use parties::AuthorizedParties;
pub use verifier::TokenVerifier;
