// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Webhook verification and dispatch errors.

use crate::storage::PersistenceError;

/// Why a delivery was refused before its payload was looked at.
///
/// Every variant fails closed. The sender retries on any non-2xx response, so
/// rejecting a genuine delivery only delays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("missing svix-id, svix-timestamp or svix-signature header")]
    MissingWebhookHeaders,

    #[error("webhook timestamp is malformed or outside the tolerance window")]
    StaleOrInvalidTimestamp,

    #[error("no v1 signature matched the delivery")]
    SignatureMismatch,

    /// The configured signing secret could not be decoded. This is a
    /// deployment problem, not a forged delivery.
    #[error("webhook signing secret is not valid base64 after the whsec_ prefix")]
    SecretDecodeFailure,
}

impl WebhookError {
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::MissingWebhookHeaders => "missing_webhook_headers",
            WebhookError::StaleOrInvalidTimestamp => "stale_or_invalid_timestamp",
            WebhookError::SignatureMismatch => "signature_mismatch",
            WebhookError::SecretDecodeFailure => "secret_decode_failure",
        }
    }
}

/// Failures after a delivery has been authenticated.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed event payload ({context}): {source}")]
    MalformedEventPayload {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl DispatchError {
    pub(crate) fn malformed(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedEventPayload {
            context: context.into(),
            source,
        }
    }
}
