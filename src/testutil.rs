// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Shared fixtures for unit tests.

use std::{sync::Arc, time::Duration};

use axum::http::{HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;
use tempfile::TempDir;

use crate::auth::{AuthorizedParties, SigningKey, TokenVerifier, DEFAULT_SESSION_COOKIE};
use crate::state::{AppState, AuthConfig};
use crate::storage::RedbUserStore;
use crate::webhooks::{WebhookSecret, WebhookVerifier};

pub(crate) const SIGNING_PRIVATE_PEM: &str = include_str!("auth/testdata/signing_private.pem");
pub(crate) const SIGNING_PUBLIC_PEM: &str = include_str!("auth/testdata/signing_public.pem");
pub(crate) const FOREIGN_PRIVATE_PEM: &str = include_str!("auth/testdata/foreign_private.pem");
pub(crate) const EC_PUBLIC_PEM: &str = include_str!("auth/testdata/ec_public.pem");

/// Svix-style secret: `whsec_` followed by 24 base64-encoded bytes.
pub(crate) const TEST_WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

pub(crate) fn sign_token(claims: &Value) -> String {
    sign_token_with(Algorithm::RS256, claims)
}

pub(crate) fn sign_token_with(algorithm: Algorithm, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(SIGNING_PRIVATE_PEM.as_bytes()).unwrap();
    encode(&Header::new(algorithm), claims, &key).unwrap()
}

/// Hand-built `header.payload.` token with an empty signature segment.
pub(crate) fn unsigned_token(header_json: &str, claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(header_json);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.")
}

pub(crate) fn test_verifier(parties: &[&str]) -> TokenVerifier {
    let key = SigningKey::from_pem(SIGNING_PUBLIC_PEM).unwrap();
    TokenVerifier::new(key, AuthorizedParties::new(parties.iter().copied()))
}

pub(crate) fn test_webhook_secret() -> WebhookSecret {
    WebhookSecret::parse(TEST_WEBHOOK_SECRET).unwrap()
}

/// The svix header triple for a delivery signed with [`TEST_WEBHOOK_SECRET`].
pub(crate) fn signed_webhook_headers(id: &str, timestamp: i64, body: &[u8]) -> HeaderMap {
    let signature = test_webhook_secret().sign(id, timestamp, body);
    let mut headers = HeaderMap::new();
    headers.insert("svix-id", HeaderValue::from_str(id).unwrap());
    headers.insert("svix-timestamp", HeaderValue::from(timestamp));
    headers.insert("svix-signature", HeaderValue::from_str(&signature).unwrap());
    headers
}

/// Application state over a redb store in a fresh temp directory.
///
/// Keep the returned [`TempDir`] alive for the duration of the test.
pub(crate) fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbUserStore::open(&dir.path().join("users.redb")).unwrap();
    let state = AppState::new(
        AuthConfig::new(test_verifier(&[]), DEFAULT_SESSION_COOKIE),
        WebhookVerifier::new(test_webhook_secret()),
        Arc::new(store),
        Duration::from_secs(5),
    );
    (state, dir)
}
