mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn diff_lists_changed_leaves() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let a = create_draft(&app, id, "gpt-4o-mini").await["id"].as_i64().unwrap();
    let b = create_draft(&app, id, "gpt-4o").await["id"].as_i64().unwrap();

    let (status, json) = get(&app, &format!("/api/v1/versions/{a}/diff/{b}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"],
        json!([{
            "field": "rag.model",
            "old_value": "gpt-4o-mini",
            "new_value": "gpt-4o",
            "change_type": "modified"
        }])
    );
}

#[tokio::test]
async fn diff_with_itself_is_empty() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let a = create_draft(&app, id, "m").await["id"].as_i64().unwrap();

    let (_, json) = get(&app, &format!("/api/v1/versions/{a}/diff/{a}")).await;
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn draft_changes_are_relative_to_published() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let v1 = create_draft(&app, id, "a").await["id"].as_i64().unwrap();
    publish(&app, v1).await;

    let v2 = create_draft(&app, id, "b").await;
    let changes = v2["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["field"], "rag.model");
    assert_eq!(changes[0]["old_value"], "a");
}

#[tokio::test]
async fn diff_with_missing_version_is_404() {
    let app = build_test_app();
    let id = create_integration(&app, None).await;
    let a = create_draft(&app, id, "m").await["id"].as_i64().unwrap();

    let (status, _) = get(&app, &format!("/api/v1/versions/{a}/diff/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
