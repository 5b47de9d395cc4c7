// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Credential lookup and the Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(ctx): Auth) -> impl IntoResponse {
//!     // ctx is AuthContext
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

use super::{AuthContext, AuthError, TokenVerifier};
use crate::state::AppState;

/// Cookie Clerk sets for same-origin sessions.
pub const DEFAULT_SESSION_COOKIE: &str = "__session";

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme is case-insensitive and the header must hold exactly two
/// space-separated parts. Anything else counts as no header at all.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Some(token)
        }
        _ => None,
    }
}

/// Value of the named cookie, if present and non-empty.
///
/// Values are returned as sent, without percent-decoding. Session tokens are
/// base64url and dot separated, so they never contain escaped characters.
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Locate the session token: bearer header first, then the session cookie.
pub fn extract_credential<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    bearer_token(headers).or_else(|| session_cookie(headers, cookie_name))
}

/// Extract and verify the request's credential.
///
/// Returns [`AuthError::NoCredentialPresented`] before any cryptographic work
/// when neither source holds a token.
pub fn authenticate(
    headers: &HeaderMap,
    verifier: &TokenVerifier,
    cookie_name: &str,
) -> Result<AuthContext, AuthError> {
    let token = extract_credential(headers, cookie_name).ok_or(AuthError::NoCredentialPresented)?;
    let claims = verifier.verify(token)?;
    Ok(AuthContext::from_claims(claims))
}

/// Extractor for authenticated users.
///
/// Reads the [`AuthContext`] left by
/// [`require_auth`](super::middleware::require_auth). On routes without the
/// middleware it authenticates the request itself.
pub struct Auth(pub AuthContext);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the context
        if let Some(ctx) = AuthContext::from_extensions(&parts.extensions).cloned() {
            return Ok(Auth(ctx));
        }

        let auth = &state.auth_config;
        let ctx = authenticate(&parts.headers, &auth.verifier, &auth.session_cookie)?;
        parts.extensions.insert(ctx.clone());
        Ok(Auth(ctx))
    }
}
