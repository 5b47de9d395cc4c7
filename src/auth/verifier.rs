// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Clerk session token verification.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. Structure and `alg` pinning (RS256/RS384/RS512 only)
//! 2. RSA signature against the configured [`SigningKey`]
//! 3. `exp` / `nbf` time bounds (`exp` is exclusive)
//! 4. `azp` allow-list
//! 5. Organization membership status

use std::collections::HashSet;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};
use serde::Deserialize;

use super::{AuthError, AuthorizedParties, ClerkClaims, SigningKey};

/// Only the fields of the JOSE header needed for algorithm pinning.
#[derive(Debug, Deserialize)]
struct JoseHeader {
    alg: String,
}

/// Verifies Clerk session tokens.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: SigningKey,
    authorized_parties: AuthorizedParties,
    /// Clock skew tolerance in seconds (0 keeps the `exp` boundary exact)
    leeway: i64,
}

impl TokenVerifier {
    pub fn new(key: SigningKey, authorized_parties: AuthorizedParties) -> Self {
        Self {
            key,
            authorized_parties,
            leeway: 0,
        }
    }

    /// Set the clock skew tolerance applied to `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = i64::try_from(leeway_secs).unwrap_or(i64::MAX);
        self
    }

    /// Verify a token against the current wall clock.
    pub fn verify(&self, token: &str) -> Result<ClerkClaims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as of `now` (Unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<ClerkClaims, AuthError> {
        let algorithm = pinned_algorithm(token)?;

        // Time-based and audience checks are done below so that each failure
        // maps to its own error and the boundaries are exact.
        let mut validation = Validation::new(algorithm);
        validation.algorithms = vec![algorithm];
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let claims = decode::<ClerkClaims>(token, self.key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
                _ => AuthError::MalformedToken,
            })?
            .claims;

        if let Some(exp) = claims.exp {
            if now >= exp.saturating_add(self.leeway) {
                return Err(AuthError::TokenExpired);
            }
        }
        if let Some(nbf) = claims.nbf {
            if now < nbf.saturating_sub(self.leeway) {
                return Err(AuthError::TokenNotYetValid);
            }
        }

        if !self.authorized_parties.permits(claims.azp.as_deref()) {
            return Err(AuthError::UnauthorizedParty(
                claims.azp.clone().unwrap_or_default(),
            ));
        }

        if claims.is_membership_pending() {
            return Err(AuthError::MembershipPending);
        }

        Ok(claims)
    }
}

/// Read the header `alg` and pin it to the RSA family.
///
/// Done by hand rather than through `decode_header` so that `none` and other
/// algorithms the JWT library cannot represent still report as unsupported.
fn pinned_algorithm(token: &str) -> Result<Algorithm, AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken);
    };

    let header_json =
        Base64UrlUnpadded::decode_vec(header).map_err(|_| AuthError::MalformedToken)?;
    let header: JoseHeader =
        serde_json::from_slice(&header_json).map_err(|_| AuthError::MalformedToken)?;

    match header.alg.as_str() {
        "RS256" => Ok(Algorithm::RS256),
        "RS384" => Ok(Algorithm::RS384),
        "RS512" => Ok(Algorithm::RS512),
        other => {
            tracing::debug!(alg = %other, "rejecting token with unpinned algorithm");
            Err(AuthError::UnsupportedAlgorithm)
        }
    }
}
