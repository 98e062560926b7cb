#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use authapi_api::auth::password::hash_password;
use authapi_api::config::ServerConfig;
use authapi_api::router::build_app_router;
use authapi_api::state::AppState;
use authapi_db::models::user::{CreateUser, User};
use authapi_db::repositories::UserRepo;
use authapi_mail::backend::{MemoryMailer, OutgoingEmail};
use authapi_mail::templates::{EmailKind, EmailRenderer};
use authapi_mail::AccountEmails;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Password that passes every default validator.
pub const STRONG_PASSWORD: &str = "v3ry-Unusual-passphrase";

/// Build a test `ServerConfig` with the project defaults, an in-memory
/// mailer, and `overrides` applied on top.
pub fn test_config_with(overrides: &[(&str, &str)]) -> ServerConfig {
    let mut env: HashMap<String, String> = [
        ("SECRET_KEY", "integration-test-secret"),
        ("DATABASE_URL", "postgres://unused"),
        ("EMAIL_BACKEND", "memory"),
        ("DEFAULT_FROM_EMAIL", "noreply@testserver.local"),
        ("SITE_DOMAIN", "testserver"),
        ("SITE_NAME", "Test Site"),
        ("CORS_ORIGINS", "http://localhost:8000,http://127.0.0.1:3000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    ServerConfig::from_lookup(|key| env.get(key).cloned()).expect("test config should load")
}

pub fn test_config() -> ServerConfig {
    test_config_with(&[])
}

/// The application router plus a handle on the outbox of its mailer.
pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<MemoryMailer>,
}

impl TestApp {
    /// A fresh handle for a single `oneshot` request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Remove and return every email sent so far.
    pub async fn emails(&self) -> Vec<OutgoingEmail> {
        self.mailer.drain().await
    }
}

/// Build the full application router (same middleware stack as `main.rs`).
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> TestApp {
    let mailer = Arc::new(MemoryMailer::default());
    let emails = AccountEmails::new(
        EmailRenderer::new().expect("templates compile"),
        mailer.clone(),
        config.email.from_address.clone(),
    );
    let router_config = config.clone();
    let state = AppState::new(pool, config, emails);
    TestApp {
        router: build_app_router(state, &router_config),
        mailer,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("JWT {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Some(token)).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), Some(token)).await
}

pub async fn send_json_auth(
    app: Router,
    method: Method,
    uri: &str,
    body: Value,
    token: &str,
) -> Response<Body> {
    send(app, method, uri, Some(body), Some(token)).await
}

/// Parse the response body as JSON (`Value::Null` when empty).
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user directly, with [`STRONG_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, is_active: bool, is_admin: bool) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            password_hash: hash_password(STRONG_PASSWORD).unwrap(),
            is_active,
            is_admin,
        },
    )
    .await
    .unwrap()
}

/// Obtain a token pair through the API, returning `(access, refresh)`.
pub async fn login(app: Router, email: &str, password: &str) -> (String, String) {
    let response = post_json(
        app,
        "/api/v1/auth/jwt/create/",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    (
        json["access"].as_str().unwrap().to_string(),
        json["refresh"].as_str().unwrap().to_string(),
    )
}

/// Pull the `(uid, token)` pair out of the link in an activation or reset email.
pub fn link_params(email: &OutgoingEmail) -> (String, String) {
    let url = email
        .text_body
        .split_whitespace()
        .find(|word| word.starts_with("http://testserver/"))
        .expect("email should contain a link");
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let token = segments.next().unwrap().to_string();
    let uid = segments.next().unwrap().to_string();
    (uid, token)
}

/// The single email of `kind` in `emails`.
pub fn only_email(emails: &[OutgoingEmail], kind: EmailKind) -> &OutgoingEmail {
    let matching: Vec<_> = emails.iter().filter(|e| e.kind == kind).collect();
    assert_eq!(matching.len(), 1, "expected one {kind:?} email, got {emails:?}");
    matching[0]
}
