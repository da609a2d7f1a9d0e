mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

async fn publish_two(app: &axum::Router, id: i64) -> (i64, i64) {
    let v1 = create_draft(app, id, "a").await["id"].as_i64().unwrap();
    publish(app, v1).await;
    let v2 = create_draft(app, id, "b").await["id"].as_i64().unwrap();
    publish(app, v2).await;
    (v1, v2)
}

#[tokio::test]
async fn rollback_publishes_copy_of_target() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let (v1, v2) = publish_two(&app, id).await;

    let (status, json) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/rollback"),
        json!({"target_version_id": v1, "reason": "Model regression", "requested_by": "ops"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let version = &json;
    assert_eq!(version["status"], "published");
    assert_eq!(version["is_rollback"], true);
    assert_eq!(version["rollback_from_version"], v1);
    assert_eq!(version["rollback_reason"], "Model regression");
    assert_eq!(version["tags"][0], "rollback");
    assert_eq!(version["version_label"], "v1.2.0");

    let (_, previous) = get(&app, &format!("/api/v1/versions/{v2}")).await;
    assert_eq!(previous["status"], "archived");

    let (_, original) = get(&app, &format!("/api/v1/versions/{v1}")).await;
    assert_eq!(version["snapshot_hash"], original["snapshot_hash"]);
    assert_eq!(original["status"], "archived");

    let new_id = version["id"].as_i64().unwrap();
    let (_, diff) = get(&app, &format!("/api/v1/versions/{v1}/diff/{new_id}")).await;
    assert_eq!(diff["data"], json!([]));
}

#[tokio::test]
async fn gated_rollback_is_pending() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let (v1, v2) = publish_two(&app, id).await;

    let mut wf = workflow(1, &["A"], false);
    wf["rollback_requires_approval"] = json!(true);
    put_json(&app, &format!("/api/v1/integrations/{id}/approval-workflow"), wf).await;

    let (status, json) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/rollback"),
        json!({"target_version_id": v1, "reason": "revert", "requested_by": "ops"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    assert_eq!(json["status"], "draft");
    assert_eq!(json["is_rollback"], true);
    assert_eq!(json["rollback_from_version"], v1);

    let (_, live) = get(&app, &format!("/api/v1/integrations/{id}/versions/published")).await;
    assert_eq!(live["data"]["id"], v2);
}

#[tokio::test]
async fn rollback_needs_reason() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let (v1, _) = publish_two(&app, id).await;

    let (status, json) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/rollback"),
        json!({"target_version_id": v1, "reason": "  ", "requested_by": "ops"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn rollback_to_draft_is_invalid_state() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let draft = create_draft(&app, id, "a").await["id"].as_i64().unwrap();

    let (status, _) = post_json(
        &app,
        &format!("/api/v1/integrations/{id}/rollback"),
        json!({"target_version_id": draft, "reason": "r", "requested_by": "ops"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn rollback_to_other_integrations_version_is_404() {
    let app = build_test_app();
    let first = create_integration(&app, None).await;
    let second = create_integration(&app, None).await;
    let (v1, _) = publish_two(&app, first).await;

    let (status, _) = post_json(
        &app,
        &format!("/api/v1/integrations/{second}/rollback"),
        json!({"target_version_id": v1, "reason": "r", "requested_by": "ops"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
