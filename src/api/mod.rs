// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::require_auth,
    state::AppState,
    storage::{OnboardingData, StarterPack},
};

pub mod health;
pub mod onboarding;
pub mod root;
pub mod users;
pub mod webhooks;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Preflight cache lifetime.
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// CORS restricted to the configured frontend origins.
///
/// Credentials are not allowed; cross-origin callers send a bearer token.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring CORS origin that is not a valid header value");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(CORS_MAX_AGE)
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Routes behind Clerk session verification
    let protected_routes = Router::new()
        .route("/api/v1/protected", get(users::protected))
        .route("/api/v1/me", get(users::get_current_user))
        .route("/api/v1/onboarding", post(onboarding::save_onboarding))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Public routes; the webhook authenticates by signature instead
    let public_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/v1", get(root::welcome))
        .route("/api/v1/", get(root::welcome))
        .route("/api/webhooks", post(webhooks::clerk_webhook));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        root::welcome,
        users::protected,
        users::get_current_user,
        onboarding::save_onboarding,
        webhooks::clerk_webhook
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            root::WelcomeResponse,
            users::ProtectedResponse,
            users::UserMeResponse,
            onboarding::OnboardingResponse,
            webhooks::WebhookAck,
            OnboardingData,
            StarterPack
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Meta", description = "API information"),
        (name = "Users", description = "Authenticated caller"),
        (name = "Onboarding", description = "Starter pack onboarding"),
        (name = "Webhooks", description = "Clerk webhook ingestion")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sign_token, signed_webhook_headers, test_state};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> (Router, AppState, tempfile::TempDir) {
        let (state, dir) = test_state();
        let cors = cors_layer(&["https://devarena.dev".to_string()]);
        (router(state.clone(), cors), state, dir)
    }

    fn live_token(sub: &str) -> String {
        sign_token(&json!({
            "sub": sub,
            "sid": "sess_1",
            "email": "a@b.com",
            "azp": "https://devarena.dev",
            "exp": chrono::Utc::now().timestamp() + 600,
        }))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn webhook_request(body: &str) -> Request<Body> {
        let headers = signed_webhook_headers("msg_1", chrono::Utc::now().timestamp(), body.as_bytes());
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks")
            .header("content-type", "application/json");
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    const USER_CREATED: &str = r#"{"type":"user.created","object":"event","data":{"id":"user_1","email_addresses":[{"id":"e1","email_address":"a@b.com"}],"primary_email_address_id":"e1"}}"#;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (app, _state, _dir) = app();
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn liveness_is_public() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_reports_storage() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checks"]["storage"], "ok");
        assert_eq!(body["checks"]["webhooks"], "ok");
    }

    #[tokio::test]
    async fn welcome_is_public_with_and_without_slash() {
        for uri in ["/api/v1", "/api/v1/"] {
            let (app, _state, _dir) = app();
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["message"], "Welcome to DevArena API v1");
            assert_eq!(body["version"], "1.0.0");
        }
    }

    #[tokio::test]
    async fn protected_route_requires_credential() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(Request::builder().uri("/api/v1/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "no_credential_presented");
    }

    #[tokio::test]
    async fn protected_route_returns_subject() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/protected")
                    .header("Authorization", format!("Bearer {}", live_token("user_1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user_id"], "user_1");
        assert_eq!(body["version"], "1.0.0");
    }

    #[tokio::test]
    async fn me_reads_claims_from_cookie_session() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/me")
                    .header("Cookie", format!("__session={}", live_token("user_1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user_id"], "user_1");
        assert_eq!(body["session_id"], "sess_1");
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["authorized_party"], "https://devarena.dev");
    }

    #[tokio::test]
    async fn pending_membership_is_rejected() {
        let (app, _state, _dir) = app();
        let token = sign_token(&json!({
            "sub": "user_1",
            "sts": "pending",
            "exp": chrono::Utc::now().timestamp() + 600,
        }));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/me")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "membership_pending");
    }

    #[tokio::test]
    async fn webhook_creates_user() {
        let (app, state, _dir) = app();
        let response = app.oneshot(webhook_request(USER_CREATED)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "User created successfully");

        let user = state.users.find_by_clerk_id("user_1").unwrap().unwrap();
        assert_eq!(user.email, "a@b.com");
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_unauthorized() {
        let (app, state, _dir) = app();
        let mut request = webhook_request(USER_CREATED);
        request.headers_mut().insert(
            "svix-signature",
            HeaderValue::from_static("v1,aW52YWxpZHNpZ25hdHVyZQ=="),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid signature");
        assert!(state.users.find_by_clerk_id("user_1").unwrap().is_none());
    }

    #[tokio::test]
    async fn webhook_without_headers_is_unauthorized() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks")
                    .body(Body::from(USER_CREATED))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_unknown_type_is_acknowledged() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(webhook_request(r#"{"type":"session.created","data":{}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Event type not handled");
    }

    #[tokio::test]
    async fn webhook_with_malformed_payload_is_bad_request() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(webhook_request(r#"{"type":"user.created","data":{"id":42}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn onboarding_before_webhook_is_not_found() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/onboarding")
                    .header("Authorization", format!("Bearer {}", live_token("user_1")))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"experience":"beginner","paths":[],"technologies":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn onboarding_after_webhook_saves_starter_pack() {
        let (app, state, _dir) = app();
        let response = app
            .clone()
            .oneshot(webhook_request(USER_CREATED))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/onboarding")
                    .header("Authorization", format!("Bearer {}", live_token("user_1")))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"experience":"intermediate","paths":["backend"],"technologies":["rust"]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["starter_pack"]["experience"], "intermediate");
        assert_eq!(body["starter_pack"]["technologies"], json!(["rust"]));

        let user = state.users.find_by_clerk_id("user_1").unwrap().unwrap();
        assert!(user.onboarding_completed);
        assert_eq!(body["starter_pack"]["user_id"], user.id);
    }

    #[tokio::test]
    async fn onboarding_rejects_invalid_body() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/onboarding")
                    .header("Authorization", format!("Bearer {}", live_token("user_1")))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"paths":"backend"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin_only() {
        let (app, _state, _dir) = app();
        let preflight = |origin: &'static str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/v1/me")
                .header("Origin", origin)
                .header("Access-Control-Request-Method", "GET")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(preflight("https://devarena.dev")).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://devarena.dev"
        );

        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(!response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (app, _state, _dir) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-doc/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["paths"]["/api/webhooks"].is_object());
    }
}
