// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{run_bounded, OnboardingData, StarterPack};

#[derive(Debug, Serialize, ToSchema)]
pub struct OnboardingResponse {
    pub message: String,
    pub starter_pack: StarterPack,
}

/// Save onboarding answers as the caller's starter pack.
///
/// The local user is created by the `user.created` webhook. Until that has
/// arrived the user is unknown and this returns 404.
#[utoipa::path(
    post,
    path = "/api/v1/onboarding",
    tag = "Onboarding",
    security(("bearer" = [])),
    request_body = OnboardingData,
    responses(
        (status = 200, description = "Onboarding saved", body = OnboardingResponse),
        (status = 400, description = "Invalid request body"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User not synced yet"),
        (status = 503, description = "Storage timed out"),
    )
)]
pub async fn save_onboarding(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    payload: Result<Json<OnboardingData>, JsonRejection>,
) -> Result<Json<OnboardingResponse>, ApiError> {
    let Json(data) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected onboarding body");
        ApiError::bad_request("Invalid request body")
    })?;

    let users = state.users.clone();
    let clerk_user_id = ctx.user_id.clone();
    let saved = run_bounded(state.persistence_timeout, move || {
        users.save_onboarding(&clerk_user_id, &data)
    })
    .await
    .map_err(|e| {
        tracing::error!(user_id = %ctx.user_id, error = %e, "failed to save onboarding data");
        ApiError::from_persistence(&e, "Failed to save onboarding data")
    })?;

    let starter_pack = saved.ok_or_else(|| {
        tracing::info!(user_id = %ctx.user_id, "onboarding for user not yet synced");
        ApiError::not_found("User not found")
    })?;

    tracing::info!(user_id = %ctx.user_id, starter_pack_id = %starter_pack.id, "onboarding saved");
    Ok(Json(OnboardingResponse {
        message: "Onboarding data saved successfully".to_string(),
        starter_pack,
    }))
}
