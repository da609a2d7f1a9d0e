mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use embedkit_core::store::AuditStore;
use embedkit_events::AuditRecorder;
use std::sync::Arc;

/// Poll the audit log until it holds `expected` entries.
async fn wait_for_entries(app: &axum::Router, id: i64, expected: usize) -> serde_json::Value {
    for _ in 0..100 {
        let (_, json) = get(app, &format!("/api/v1/integrations/{id}/audit-log")).await;
        if json["data"].as_array().map_or(0, Vec::len) >= expected {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit log never reached {expected} entries");
}

#[tokio::test]
async fn lifecycle_events_are_chained() {
    let (app, state) = build_test_app_with_state();
    let store: Arc<dyn AuditStore> = Arc::clone(&state.audit);
    tokio::spawn(AuditRecorder::run(store, state.event_bus.subscribe()));

    let id = create_integration(&app, None).await;
    let vid = create_draft(&app, id, "a").await["id"].as_i64().unwrap();
    publish(&app, vid).await;

    // integration.created, version.created, version.published
    let log = wait_for_entries(&app, id, 3).await;
    let types: Vec<&str> = log["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["version.published", "version.created", "integration.created"]);

    let (status, verification) = get(&app, &format!("/api/v1/integrations/{id}/audit-log/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verification["valid"], true);
    assert_eq!(verification["entries_checked"], 3);
}

#[tokio::test]
async fn embed_key_plaintext_never_reaches_the_log() {
    let (app, state) = build_test_app_with_state();
    let store: Arc<dyn AuditStore> = Arc::clone(&state.audit);
    tokio::spawn(AuditRecorder::run(store, state.event_bus.subscribe()));

    let id = create_integration(&app, None).await;
    let (_, created) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/embed-keys"),
        serde_json::json!({"label": "web"}),
    )
    .await;
    let plaintext = created["plaintext"].as_str().unwrap().to_string();

    let log = wait_for_entries(&app, id, 2).await;
    assert!(!log.to_string().contains(&plaintext));
}

#[tokio::test]
async fn audit_log_of_missing_integration_is_404() {
    let app = build_test_app();
    let (status, _) = get(&app, "/api/v1/integrations/77/audit-log").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
