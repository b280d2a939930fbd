//! Shared helpers for the integration suites: an in-memory app instance and
//! request plumbing driving the router through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use optfin::api::routes::{build_router, ApiState};
use optfin::config::AppConfig;
use optfin::services::telegram::NoopNotifier;
use optfin::storage::run_migrations;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub state: ApiState,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

pub async fn setup_test_app_with(tweak: impl FnOnce(&mut AppConfig)) -> TestApp {
    // A single connection keeps every request on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create sqlite pool");
    run_migrations(&pool).await.expect("run migrations for tests");

    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    tweak(&mut config);

    TestApp { state: ApiState::new(config, pool, Arc::new(NoopNotifier)) }
}

pub async fn send_request(
    app: &TestApp,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(json) = body {
        let bytes = serde_json::to_vec(&json).expect("serialize body");
        builder
            .header("content-type", "application/json")
            .body(Body::from(bytes))
            .expect("build request")
    } else {
        builder.body(Body::empty()).expect("build request")
    };

    app.router().oneshot(request).await.expect("request")
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

/// Register an account and return the response body (user summary + tokens).
pub async fn register_user(app: &TestApp, login: &str, password: &str) -> Value {
    register_user_with_role(app, login, password, None).await
}

pub async fn register_user_with_role(
    app: &TestApp,
    login: &str,
    password: &str,
    role: Option<&str>,
) -> Value {
    let mut body = json!({
        "login": login,
        "email": format!("{}@example.com", login),
        "password": password,
    });
    if let Some(role) = role {
        body["role"] = json!(role);
    }

    let response = send_request(app, Method::POST, "/api/auth/register", None, Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED, "registration should succeed");
    read_json(response).await
}

pub async fn login(app: &TestApp, login_or_email: &str, password: &str) -> Response {
    send_request(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login_or_email": login_or_email, "password": password })),
    )
    .await
}

pub fn access_token(auth_response: &Value) -> &str {
    auth_response["access_token"].as_str().expect("access token in response")
}

pub fn refresh_token(auth_response: &Value) -> &str {
    auth_response["refresh_token"].as_str().expect("refresh token in response")
}
