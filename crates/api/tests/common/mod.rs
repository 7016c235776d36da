//! Shared harness for the HTTP integration tests.
//!
//! The application is wired to the in-memory stores from `pullup_core::memory`
//! and routed through the same [`build_app_router`] the binary uses, so the
//! full middleware stack is exercised without a database.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pullup_core::generation::{AiSettings, PlanTemplateGenerator};
use pullup_core::memory::{MemoryEventLog, MemoryGenerationLog, MemorySessionStore};
use pullup_core::types::DbId;
use tower::ServiceExt;

use pullup_api::config::ServerConfig;
use pullup_api::middleware::auth::USER_ID_HEADER;
use pullup_api::router::build_app_router;
use pullup_api::state::AppState;

pub const USER: DbId = 7;
pub const OTHER_USER: DbId = 8;

/// A built router plus handles to the stores behind it.
pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<MemorySessionStore>,
    pub generations: Arc<MemoryGenerationLog>,
    pub events: Arc<MemoryEventLog>,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Test configuration with safe defaults.
pub fn test_config(ai: AiSettings) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        ai,
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(AiSettings {
        timeout: Duration::from_secs(5),
        ..AiSettings::default()
    })
}

pub fn build_test_app_with(ai: AiSettings) -> TestApp {
    let sessions = Arc::new(MemorySessionStore::default());
    let generations = Arc::new(MemoryGenerationLog::default());
    let events = Arc::new(MemoryEventLog::default());

    let state = AppState::new(
        test_config(ai),
        sessions.clone(),
        generations.clone(),
        events.clone(),
        Arc::new(PlanTemplateGenerator),
    );

    TestApp {
        router: build_app_router(state),
        sessions,
        generations,
        events,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, USER.to_string());
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

/// Send a request as an arbitrary user, or with no identity at all.
pub async fn get_as(app: Router, uri: &str, user: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
