//! Integration tests for the password-authentication endpoints.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use facegate::config::Config;
use facegate::embedder::{EmbedError, FaceEmbedder};
use facegate::state::SharedState;
use facegate::tokens::{TokenCodec, TokenKind};

/// Deterministic stand-in for the embedding model. Auth tests never touch
/// the face endpoints, but state construction still needs an embedder.
struct TestEmbedder;

#[async_trait::async_trait]
impl FaceEmbedder for TestEmbedder {
    fn dim(&self) -> usize {
        4
    }

    async fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
        let mut vector = [0.0f32; 4];
        for (i, byte) in image.iter().take(4).enumerate() {
            vector[i] = f32::from(*byte);
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(EmbedError::UnreadableImage);
        }
        Ok(vector.iter().map(|v| v / norm).collect())
    }
}

fn test_config(email_enabled: bool) -> Config {
    let db_path =
        std::env::temp_dir().join(format!("facegate-auth-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.server.secure_cookies = false;
    config.face.embedding_dim = 4;
    config.email.enabled = email_enabled;
    config.email.provider = "log".to_string();
    // Minimal hashing cost so tests stay quick.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app(config: Config) -> Router {
    let shared = SharedState::with_embedder(config, Arc::new(TestEmbedder))
        .await
        .expect("failed to create shared state");
    let state = facegate::api::create_app_state(Arc::new(shared), None);
    facegate::api::router(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

async fn register(app: &Router, login: &str, email: &str, password: &str) -> StatusCode {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({ "login": login, "email": email, "password": password }),
        ))
        .await
        .unwrap();
    response.status()
}

async fn login(app: &Router, email: &str, password: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn register_login_and_me_flow() {
    let app = spawn_app(test_config(false)).await;

    let status = register(&app, "alice", "alice@example.com", "hunter2222").await;
    assert_eq!(status, StatusCode::CREATED);

    // Email is disabled, so the account is usable right away.
    let response = login(&app, "alice@example.com", "hunter2222").await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["token_type"], "Bearer");

    let me = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    let me_body = body_json(me).await;
    assert_eq!(me_body["data"]["login"], "alice");
    assert_eq!(me_body["data"]["email"], "alice@example.com");
    assert_eq!(me_body["data"]["email_confirmed"], true);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app(test_config(false)).await;
    register(&app, "bob", "bob@example.com", "correct-horse").await;

    let response = login(&app, "bob@example.com", "wrong-horse").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown email is indistinguishable from a wrong password.
    let response = login(&app, "nobody@example.com", "whatever123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_login_and_email_conflict() {
    let app = spawn_app(test_config(false)).await;
    assert_eq!(
        register(&app, "carol", "carol@example.com", "password1").await,
        StatusCode::CREATED
    );

    // Same login, different email: login is checked first.
    assert_eq!(
        register(&app, "carol", "other@example.com", "password1").await,
        StatusCode::CONFLICT
    );

    // Different login, same email.
    assert_eq!(
        register(&app, "carol2", "carol@example.com", "password1").await,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn register_validation_errors() {
    let app = spawn_app(test_config(false)).await;

    assert_eq!(
        register(&app, "dave", "dave@example.com", "short").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        register(&app, "dave", "not-an-email", "longenough").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        register(&app, "d!", "dave@example.com", "longenough").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn refresh_mints_access_token_only() {
    let app = spawn_app(test_config(false)).await;
    register(&app, "erin", "erin@example.com", "password123").await;

    let body = body_json(login(&app, "erin@example.com", "password123").await).await;
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(header::AUTHORIZATION, format!("Bearer {refresh_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_null());

    // An access token is the wrong kind for the refresh endpoint.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn protected_route_token_failures() {
    let config = test_config(false);
    let codec = TokenCodec::new(&config.tokens);
    let app = spawn_app(config).await;

    // No token at all.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Garbage token.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Expired token.
    let expired = codec
        .issue_with_ttl("1", TokenKind::Access, chrono::Duration::seconds(-5))
        .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Right signature, wrong kind.
    let refresh = codec.issue("1", TokenKind::Refresh).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn auth_cookie_is_accepted_for_protected_routes() {
    let app = spawn_app(test_config(false)).await;
    register(&app, "frank", "frank@example.com", "password123").await;

    let body = body_json(login(&app, "frank@example.com", "password123").await).await;
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, format!("access_token={access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_both_cookies() {
    let app = spawn_app(test_config(false)).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn email_confirmation_gates_login() {
    let config = test_config(true);
    let codec = TokenCodec::new(&config.tokens);
    let app = spawn_app(config).await;

    register(&app, "grace", "grace@example.com", "password123").await;

    // Unconfirmed accounts cannot log in.
    let response = login(&app, "grace@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "email address is not confirmed");

    // The confirmation state is reported before the password is checked, so
    // a wrong password gets the same answer.
    let response = login(&app, "grace@example.com", "wrongpassword").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "email address is not confirmed");

    // The confirm token the mailer would have delivered.
    let token = codec
        .issue("grace@example.com", TokenKind::EmailConfirm)
        .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/confirm/{token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Confirming twice is not an error.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/confirm/{token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(&app, "grace@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn confirm_with_wrong_kind_or_unknown_email() {
    let config = test_config(true);
    let codec = TokenCodec::new(&config.tokens);
    let app = spawn_app(config).await;

    // An access token cannot confirm an email.
    let token = codec.issue("1", TokenKind::Access).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/confirm/{token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Valid token for an email that does not exist.
    let token = codec
        .issue("ghost@example.com", TokenKind::EmailConfirm)
        .unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/confirm/{token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn password_reset_flow() {
    let config = test_config(true);
    let codec = TokenCodec::new(&config.tokens);
    let app = spawn_app(config).await;

    register(&app, "heidi", "heidi@example.com", "oldpassword").await;

    // No reset before the address is confirmed.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/reset",
            serde_json::json!({ "email": "heidi@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let confirm = codec
        .issue("heidi@example.com", TokenKind::EmailConfirm)
        .unwrap();
    app.clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/confirm/{confirm}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Requesting a reset for an unknown address is a 404.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/reset",
            serde_json::json!({ "email": "ghost@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/reset",
            serde_json::json!({ "email": "heidi@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Complete the reset with the token the mailer would have delivered.
    let token = codec
        .issue("heidi@example.com", TokenKind::PasswordReset)
        .unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/auth/reset/{token}"),
            serde_json::json!({ "new_password": "newpassword" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(&app, "heidi@example.com", "oldpassword").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = login(&app, "heidi@example.com", "newpassword").await;
    assert_eq!(response.status(), StatusCode::OK);
}
