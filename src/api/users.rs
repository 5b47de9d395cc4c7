// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Endpoints describing the authenticated caller.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::root::API_VERSION;
use crate::auth::{Auth, AuthContext};

/// Response for GET /api/v1/protected
#[derive(Debug, Serialize, ToSchema)]
pub struct ProtectedResponse {
    pub message: String,
    pub version: String,
    pub user_id: String,
}

/// Response for GET /api/v1/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Clerk user id (`sub`)
    pub user_id: String,
    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Origin the token was issued for (`azp`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_party: Option<String>,
}

impl From<AuthContext> for UserMeResponse {
    fn from(ctx: AuthContext) -> Self {
        Self {
            user_id: ctx.user_id,
            session_id: ctx.session_id,
            email: ctx.claims.email,
            authorized_party: ctx.claims.azp,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/protected",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller is authenticated", body = ProtectedResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn protected(Auth(ctx): Auth) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "Welcome to DevArena API v1 protected route".to_string(),
        version: API_VERSION.to_string(),
        user_id: ctx.user_id,
    })
}

/// Get the current authenticated user's session information.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(ctx): Auth) -> Json<UserMeResponse> {
    Json(ctx.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_me_response_from_auth_context() {
        let claims = serde_json::from_value(json!({
            "sub": "user_123",
            "sid": "sess_abc",
            "azp": "https://devarena.dev",
        }))
        .unwrap();

        let response: UserMeResponse = AuthContext::from_claims(claims).into();
        assert_eq!(response.user_id, "user_123");
        assert_eq!(response.session_id.as_deref(), Some("sess_abc"));
        assert_eq!(response.email, None);
        assert_eq!(response.authorized_party.as_deref(), Some("https://devarena.dev"));
    }
}
