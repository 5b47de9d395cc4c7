// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Clerk webhook endpoint.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::webhooks::{ClerkEvent, DispatchError, WebhookError};

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub message: String,
}

/// Receive a Clerk webhook delivery.
///
/// Any non-2xx response makes Clerk redeliver, so every failure here is
/// reported rather than retried.
#[utoipa::path(
    post,
    path = "/api/webhooks",
    tag = "Webhooks",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event applied or ignored", body = WebhookAck),
        (status = 400, description = "Malformed event payload"),
        (status = 401, description = "Signature verification failed"),
        (status = 500, description = "Persistence failed"),
        (status = 503, description = "Persistence timed out"),
    )
)]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let payload = state.webhooks.verify(&headers, &body).map_err(|e| {
        match e {
            WebhookError::SecretDecodeFailure => tracing::error!(
                error_code = e.error_code(),
                "webhook rejected: signing secret is misconfigured"
            ),
            _ => tracing::warn!(error_code = e.error_code(), "webhook rejected"),
        }
        ApiError::unauthorized("Invalid signature")
    })?;

    let event = ClerkEvent::decode(payload).map_err(|e| {
        tracing::warn!(error = %e, "webhook payload could not be decoded");
        ApiError::bad_request("Invalid event payload")
    })?;

    tracing::info!(
        event_type = event.kind(),
        clerk_user_id = ?event.clerk_user_id(),
        "received Clerk webhook"
    );

    let outcome = state.dispatcher.dispatch(event).await.map_err(|e| match e {
        DispatchError::MalformedEventPayload { .. } => ApiError::bad_request("Invalid event payload"),
        DispatchError::Persistence(err) => {
            tracing::error!(error = %err, "webhook event could not be persisted");
            ApiError::from_persistence(&err, "Failed to process event")
        }
    })?;

    Ok(Json(WebhookAck {
        message: outcome.message().to_string(),
    }))
}
