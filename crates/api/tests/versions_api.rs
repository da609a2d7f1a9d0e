mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn create_draft_returns_resolved_snapshot() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;

    let version = create_draft(&app, id, "gpt-4o-mini").await;
    assert_eq!(version["status"], "draft");
    assert_eq!(version["version_label"], "v1.0.0");
    assert_eq!(version["integration_id"], id);
    assert_eq!(version["config_snapshot"]["rag"]["temperature"], 0.7);
    assert_eq!(version["snapshot_hash"].as_str().unwrap().len(), 64);
    assert_eq!(version["is_rollback"], false);
}

#[tokio::test]
async fn create_draft_takes_snapshot_field() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;

    let (status, json) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/versions"),
        json!({
            "created_by": "alice",
            "release_notes": "First cut",
            "tags": ["Launch"],
            "snapshot": snapshot("claude-haiku")
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["config_snapshot"]["rag"]["model"], "claude-haiku");
    assert_eq!(json["tags"], json!(["launch"]));

    let (status, json) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/versions"),
        json!({"created_by": "alice", "config_snapshot": snapshot("claude-sonnet")}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["config_snapshot"]["rag"]["model"], "claude-sonnet");
}

#[tokio::test]
async fn invalid_snapshot_is_rejected() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;

    let (status, json) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/versions"),
        json!({
            "created_by": "alice",
            "snapshot": {"name": "x", "rag": {"model": "m"}, "theme": {"primary_color": "blue"}}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn draft_for_missing_integration_is_404() {
    let app = build_test_app();
    let (status, json) = post_json(
        &app,
        "/api/v1/integrations/999/versions",
        json!({"created_by": "alice", "snapshot": snapshot("m")}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn list_is_newest_first_and_paginated() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    for model in ["a", "b", "c"] {
        create_draft(&app, id, model).await;
    }

    let (status, json) = get(&app, &format!("/api/v1/integrations/{id}/versions")).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version_label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, ["v1.2.0", "v1.1.0", "v1.0.0"]);

    let (_, page) = get(&app, &format!("/api/v1/integrations/{id}/versions?limit=1&offset=1")).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 1);
    assert_eq!(page["data"][0]["version_label"], "v1.1.0");
}

#[tokio::test]
async fn publish_without_workflow_archives_previous() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let v1 = create_draft(&app, id, "a").await["id"].as_i64().unwrap();
    let v2 = create_draft(&app, id, "b").await["id"].as_i64().unwrap();

    let (status, json) = publish(&app, v1).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "published");

    let (status, _) = publish(&app, v2).await;
    assert_eq!(status, StatusCode::OK);

    let (_, old) = get(&app, &format!("/api/v1/versions/{v1}")).await;
    assert_eq!(old["status"], "archived");
    assert!(old["archived_at"].is_string());

    let (_, live) = get(&app, &format!("/api/v1/integrations/{id}/versions/published")).await;
    assert_eq!(live["data"]["id"], v2);
}

#[tokio::test]
async fn published_is_null_before_first_publish() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;

    let (status, json) = get(&app, &format!("/api/v1/integrations/{id}/versions/published")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn republishing_is_invalid_state() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let v1 = create_draft(&app, id, "a").await["id"].as_i64().unwrap();
    publish(&app, v1).await;

    let (status, json) = publish(&app, v1).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_STATE");
}

#[tokio::test]
async fn draft_metadata_patch_and_stale_token() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let draft = create_draft(&app, id, "a").await;
    let vid = draft["id"].as_i64().unwrap();
    let original_token = draft["updated_at"].clone();

    let (status, edited) = patch_json(
        &app,
        &format!("/api/v1/versions/{vid}"),
        json!({"release_notes": "Tuned prompts", "tags": ["Beta", "beta", "prompts"],
               "expected_updated_at": original_token}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{edited}");
    assert_eq!(edited["release_notes"], "Tuned prompts");
    assert_eq!(edited["tags"], json!(["beta", "prompts"]));
    assert_eq!(edited["config_snapshot"], draft["config_snapshot"]);

    let (status, json) = patch_json(
        &app,
        &format!("/api/v1/versions/{vid}"),
        json!({"release_notes": "late edit", "expected_updated_at": original_token}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn published_metadata_is_frozen() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let vid = create_draft(&app, id, "a").await["id"].as_i64().unwrap();
    publish(&app, vid).await;

    let (status, _) = patch_json(&app, &format!("/api/v1/versions/{vid}"), json!({"tags": ["x"]})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn verify_reports_matching_hash() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let draft = create_draft(&app, id, "a").await;
    let vid = draft["id"].as_i64().unwrap();

    let (status, json) = get(&app, &format!("/api/v1/versions/{vid}/verify")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["snapshot_hash"], draft["snapshot_hash"]);
}

#[tokio::test]
async fn missing_version_is_404() {
    let app = build_test_app();
    let (status, json) = get(&app, "/api/v1/versions/12345").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Version with id 12345 not found");
}
