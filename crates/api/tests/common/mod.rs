#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use embedkit_api::config::ServerConfig;
use embedkit_api::router::build_router;
use embedkit_api::state::AppState;
use embedkit_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_body_bytes: 64 * 1024,
        shutdown_timeout_secs: 5,
        database_url: None,
        db_max_connections: 1,
    }
}

/// Application state on the in-memory store with a fresh event bus.
pub fn test_state() -> AppState {
    AppState::in_memory(test_config(), Arc::new(EventBus::default()))
}

/// Build the full application router (same middleware stack as `main.rs`)
/// on the in-memory store.
pub fn build_test_app() -> Router {
    build_router(test_state(), &test_config()).unwrap()
}

/// Like [`build_test_app`] but also returns the state, for tests that need
/// the event bus or stores directly.
pub fn build_test_app_with_state() -> (Router, AppState) {
    let state = test_state();
    (build_router(state.clone(), &test_config()).unwrap(), state)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::POST, uri, None).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn snapshot(model: &str) -> Value {
    json!({
        "name": "Help center",
        "allowed_domains": ["example.com"],
        "rag": {"model": model},
        "theme": {"primary_color": "#0055ff"}
    })
}

pub fn workflow(required: u32, approvers: &[&str], auto_publish: bool) -> Value {
    json!({
        "enabled": true,
        "required_approvers": required,
        "approvers": approvers,
        "auto_publish_on_approval": auto_publish,
    })
}

/// Create an integration and return its id.
pub async fn create_integration(app: &Router, workflow: Option<Value>) -> i64 {
    let mut body = json!({"name": "Help center"});
    if let Some(workflow) = workflow {
        body["approval_workflow"] = workflow;
    }
    let (status, json) = post_json(app, "/api/v1/integrations", body).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_i64().unwrap()
}

/// Create a draft and return the version JSON.
pub async fn create_draft(app: &Router, integration_id: i64, model: &str) -> Value {
    let (status, json) = post_json(
        app,
        &format!("/api/v1/integrations/{integration_id}/versions"),
        json!({
            "created_by": "alice",
            "release_notes": format!("use {model}"),
            "snapshot": snapshot(model),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

pub async fn approve(app: &Router, version_id: i64, approver: &str) -> (StatusCode, Value) {
    post_json(
        app,
        &format!("/api/v1/versions/{version_id}/approve"),
        json!({"approver": approver}),
    )
    .await
}

pub async fn publish(app: &Router, version_id: i64) -> (StatusCode, Value) {
    post_empty(app, &format!("/api/v1/versions/{version_id}/publish")).await
}
