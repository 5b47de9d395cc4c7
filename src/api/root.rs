// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Public API root.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/",
    tag = "Meta",
    responses(
        (status = 200, description = "API welcome message", body = WelcomeResponse)
    )
)]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to DevArena API v1".to_string(),
        version: API_VERSION.to_string(),
    })
}
