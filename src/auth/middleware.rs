// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Authentication middleware for Axum.
//!
//! Applied to the protected router subtree:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/api/v1/me", get(users::get_current_user))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```
//!
//! On success the [`AuthContext`](super::AuthContext) is stored in the
//! request extensions for the rest of the request's lifetime.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate;
use crate::state::AppState;

/// Reject unauthenticated requests, otherwise attach the verified identity.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = &state.auth_config;

    match authenticate(request.headers(), &auth.verifier, &auth.session_cookie) {
        Ok(ctx) => {
            tracing::debug!(user_id = %ctx.user_id, "request authenticated");
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                error_code = e.error_code(),
                path = %request.uri().path(),
                "authentication failed"
            );
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::testutil::{sign_token, test_state};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
        Extension, Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    async fn echo_user(Extension(ctx): Extension<AuthContext>) -> String {
        ctx.user_id
    }

    fn app() -> (Router, tempfile::TempDir) {
        let (state, dir) = test_state();
        let router = Router::new()
            .route("/echo", get(echo_user))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            ))
            .with_state(state);
        (router, dir)
    }

    #[tokio::test]
    async fn rejects_request_without_credential() {
        let (app, _dir) = app();
        let response = app
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "no_credential_presented");
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let (app, _dir) = app();
        let token = sign_token(&json!({ "sub": "u1", "exp": chrono::Utc::now().timestamp() - 5 }));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "token_expired");
    }

    #[tokio::test]
    async fn attaches_context_for_downstream_handlers() {
        let (app, _dir) = app();
        let token = sign_token(&json!({ "sub": "u1", "exp": chrono::Utc::now().timestamp() + 60 }));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header("Cookie", format!("__session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"u1");
    }
}
