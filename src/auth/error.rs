// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every variant is terminal for the request and maps to 401. The message is
/// meant for diagnostics and never includes key material or signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither an Authorization header nor a session cookie was present
    NoCredentialPresented,
    /// Token is not a well-formed compact JWT
    MalformedToken,
    /// Header `alg` is outside the pinned RSA family
    UnsupportedAlgorithm,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token is not yet valid
    TokenNotYetValid,
    /// `azp` claim is not in the allow-list
    UnauthorizedParty(String),
    /// Organization membership is still pending
    MembershipPending,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NoCredentialPresented => "no_credential_presented",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::UnauthorizedParty(_) => "unauthorized_party",
            AuthError::MembershipPending => "membership_pending",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NoCredentialPresented => write!(
                f,
                "No session token found. Provide Authorization header or session cookie."
            ),
            AuthError::MalformedToken => write!(f, "Invalid token: token is malformed"),
            AuthError::UnsupportedAlgorithm => {
                write!(f, "Invalid token: unexpected signing method")
            }
            AuthError::InvalidSignature => write!(f, "Invalid token: signature is invalid"),
            AuthError::TokenExpired => write!(f, "Invalid token: token is expired"),
            AuthError::TokenNotYetValid => write!(f, "Invalid token: token is not yet valid"),
            AuthError::UnauthorizedParty(party) => {
                write!(f, "Invalid token: unauthorized party: {party}")
            }
            AuthError::MembershipPending => {
                write!(f, "Invalid token: user organization membership is pending")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
