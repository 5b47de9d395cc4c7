// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! JWT claims and the per-request authentication context.

use axum::http::Extensions;
use serde::{Deserialize, Serialize};

/// Organization membership status Clerk reports before an invite is accepted.
pub const PENDING_STATUS: &str = "pending";

/// Claims carried by a Clerk session token.
///
/// Only ever produced by [`TokenVerifier`](super::TokenVerifier) after the
/// signature has been checked.
/// See: https://clerk.com/docs/backend-requests/resources/session-tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkClaims {
    /// Subject - the Clerk user ID
    pub sub: String,

    /// Clerk session ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Authorized party (origin that requested the token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Primary email, when the session token template includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Organization membership status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sts: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not before (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl ClerkClaims {
    /// Whether the organization membership has not been activated yet.
    pub fn is_membership_pending(&self) -> bool {
        self.sts.as_deref() == Some(PENDING_STATUS)
    }
}

/// Verified identity attached to a request.
///
/// Inserted into the request extensions by
/// [`require_auth`](super::middleware::require_auth) and read back with the
/// [`Auth`](super::Auth) extractor or [`AuthContext::from_extensions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Canonical user ID (Clerk `sub` claim)
    pub user_id: String,

    /// Session ID, if the token carried one
    pub session_id: Option<String>,

    /// Full verified claims
    pub claims: ClerkClaims,
}

impl AuthContext {
    /// Create from verified claims.
    pub fn from_claims(claims: ClerkClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            session_id: claims.sid.clone(),
            claims,
        }
    }

    /// Look up the context attached earlier in the request.
    ///
    /// `None` means authentication never ran for this request, which is
    /// different from an authenticated user with an empty session ID.
    pub fn from_extensions(extensions: &Extensions) -> Option<&AuthContext> {
        extensions.get::<AuthContext>()
    }
}
