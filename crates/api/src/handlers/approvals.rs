//! Handlers for the approval gate.

use axum::extract::{Path, State};
use axum::Json;
use embedkit_core::lifecycle::ApprovalStatus;
use embedkit_core::types::DbId;
use embedkit_core::versioning::Version;
use embedkit_events::event_types;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppResult;
use crate::handlers::{emit_publish_events, version_event};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approver: String,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub approved: bool,
    /// `false` when this approver had already approved the version.
    pub newly_recorded: bool,
    pub approval_count: usize,
    pub satisfied: bool,
    pub auto_published: bool,
    /// The published version after a successful auto-publish, otherwise the
    /// approved draft.
    pub version: Version,
}

/// POST /api/v1/versions/{id}/approve
///
/// Approving twice is not an error. When the approval completes the policy
/// and the workflow auto-publishes, the publish happens here; if it fails
/// the approval still stands and the failure is recorded as an event.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<ApproveRequest>,
) -> AppResult<Json<ApproveResponse>> {
    let outcome = state.versions.approve(id, &body.approver).await?;
    let approver = body.approver.trim();

    if outcome.newly_recorded {
        state.publish(
            version_event(event_types::VERSION_APPROVED, &outcome.version)
                .with_actor(approver)
                .with_payload(json!({
                    "approval_count": outcome.approval_count,
                    "satisfied": outcome.satisfied,
                })),
        );
    }

    let mut version = outcome.version;
    let mut auto_published = false;
    match outcome.auto_publish {
        Some(Ok(published)) => {
            emit_publish_events(&state, &published, Some(approver));
            version = published.published;
            auto_published = true;
        }
        Some(Err(e)) => {
            state.publish(
                version_event(event_types::VERSION_AUTO_PUBLISH_FAILED, &version)
                    .with_actor(approver)
                    .with_payload(json!({ "error": e.to_string() })),
            );
        }
        None => {}
    }

    Ok(Json(ApproveResponse {
        approved: true,
        newly_recorded: outcome.newly_recorded,
        approval_count: outcome.approval_count,
        satisfied: outcome.satisfied,
        auto_published,
        version,
    }))
}

/// GET /api/v1/versions/{id}/approvals
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApprovalStatus>> {
    let status = state.versions.approval_status(id).await?;
    Ok(Json(status))
}
