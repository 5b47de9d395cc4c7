// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Svix-style webhook signature verification.
//!
//! A delivery carries three headers:
//!
//! - `svix-id`: opaque delivery id
//! - `svix-timestamp`: Unix seconds as a decimal string
//! - `svix-signature`: space-separated `v1,<base64>` entries
//!
//! The signed content is `{svix-id}.{svix-timestamp}.{body}` with the body
//! bytes exactly as received. The MAC is HMAC-SHA256 keyed with the decoded
//! `whsec_` secret. Any one matching `v1` entry authenticates the delivery,
//! which lets old and new secrets overlap during rotation.

use std::fmt;

use axum::http::HeaderMap;
use base64ct::{Base64, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

pub const SVIX_ID_HEADER: &str = "svix-id";
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

/// Prefix Clerk puts in front of the base64 secret.
pub const SECRET_PREFIX: &str = "whsec_";

/// Replay window in seconds, applied in both directions.
pub const DEFAULT_TOLERANCE_SECS: u64 = 5 * 60;

const SIGNATURE_VERSION: &str = "v1";

/// Decoded webhook signing key.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    /// Strip the `whsec_` prefix (if present) and base64-decode the rest.
    ///
    /// An empty key is refused: an HMAC keyed with nothing authenticates
    /// nothing.
    pub fn parse(raw: &str) -> Result<Self, WebhookError> {
        let encoded = raw.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let bytes = Base64::decode_vec(encoded).map_err(|_| WebhookError::SecretDecodeFailure)?;
        if bytes.is_empty() {
            return Err(WebhookError::SecretDecodeFailure);
        }
        Ok(Self(bytes))
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).map_err(|_| WebhookError::SecretDecodeFailure)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Produce a `v1,<base64>` signature entry for a delivery.
    #[cfg(test)]
    pub(crate) fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let tag = self
            .mac(id, &timestamp.to_string(), body)
            .unwrap()
            .finalize()
            .into_bytes();
        format!("{SIGNATURE_VERSION},{}", Base64::encode_string(&tag))
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Body bytes that passed [`WebhookVerifier::verify`].
///
/// Only this module can construct one, so event decoding never sees an
/// unauthenticated payload.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedPayload<'a>(&'a [u8]);

impl<'a> VerifiedPayload<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn assume_verified(body: &'a [u8]) -> Self {
        Self(body)
    }
}

/// Verifies webhook deliveries against the configured secret.
///
/// When the configured secret could not be decoded the verifier still
/// exists, but every delivery is refused with
/// [`WebhookError::SecretDecodeFailure`].
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Option<WebhookSecret>,
    tolerance: u64,
}

impl WebhookVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            secret: Some(secret),
            tolerance: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Build from the raw configured string, failing closed on a bad secret.
    pub fn from_secret(raw: &str) -> Self {
        match WebhookSecret::parse(raw) {
            Ok(secret) => Self::new(secret),
            Err(e) => {
                tracing::error!(
                    error_code = e.error_code(),
                    "CLERK_WEBHOOK_SIGNING_SECRET could not be decoded; all webhook deliveries will be rejected"
                );
                Self {
                    secret: None,
                    tolerance: DEFAULT_TOLERANCE_SECS,
                }
            }
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance = tolerance_secs;
        self
    }

    /// Whether a usable secret is loaded.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a delivery against the current wall clock.
    pub fn verify<'a>(
        &self,
        headers: &HeaderMap,
        body: &'a [u8],
    ) -> Result<VerifiedPayload<'a>, WebhookError> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    /// Verify a delivery as of `now` (Unix seconds).
    pub fn verify_at<'a>(
        &self,
        headers: &HeaderMap,
        body: &'a [u8],
        now: i64,
    ) -> Result<VerifiedPayload<'a>, WebhookError> {
        let id = header(headers, SVIX_ID_HEADER);
        let timestamp = header(headers, SVIX_TIMESTAMP_HEADER);
        let signatures = header(headers, SVIX_SIGNATURE_HEADER);
        let (Some(id), Some(timestamp), Some(signatures)) = (id, timestamp, signatures) else {
            return Err(WebhookError::MissingWebhookHeaders);
        };

        let sent_at: i64 = timestamp
            .parse()
            .map_err(|_| WebhookError::StaleOrInvalidTimestamp)?;
        if now.abs_diff(sent_at) > self.tolerance {
            return Err(WebhookError::StaleOrInvalidTimestamp);
        }

        let secret = self
            .secret
            .as_ref()
            .ok_or(WebhookError::SecretDecodeFailure)?;
        let mac = secret.mac(id, timestamp, body)?;

        let matched = signatures
            .split(' ')
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, value)| Base64::decode_vec(value).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

        if matched {
            Ok(VerifiedPayload(body))
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }

    /// Boolean form of [`verify`](Self::verify).
    pub fn is_authentic(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        self.verify(headers, body).is_ok()
    }
}

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .filter(|value| !value.is_empty())
}
