//! Handler for the rollback engine.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use embedkit_core::lifecycle::{RollbackOutcome, RollbackRequest};
use embedkit_core::types::DbId;
use embedkit_core::versioning::Version;
use embedkit_events::event_types;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::handlers::{emit_publish_events, version_event};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RollbackBody {
    pub target_version_id: DbId,
    pub reason: String,
    pub requested_by: String,
}

/// POST /api/v1/integrations/{id}/rollback
///
/// Creates a new version carrying the target's snapshot and returns it:
/// 200 when it went live, 202 when it is a draft awaiting approval.
pub async fn rollback(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
    Json(body): Json<RollbackBody>,
) -> AppResult<(StatusCode, Json<Version>)> {
    let outcome = state
        .versions
        .rollback(&RollbackRequest {
            integration_id,
            target_version_id: body.target_version_id,
            reason: body.reason,
            requested_by: body.requested_by,
        })
        .await?;

    let version = outcome.version();
    state.publish(
        version_event(event_types::VERSION_ROLLED_BACK, version)
            .with_actor(version.created_by.clone())
            .with_payload(json!({
                "rollback_from_version": version.rollback_from_version,
                "reason": version.rollback_reason,
                "pending_approval": matches!(outcome, RollbackOutcome::PendingApproval(_)),
            })),
    );

    let (status, version) = match outcome {
        RollbackOutcome::Published(published) => {
            emit_publish_events(&state, &published, Some(published.published.created_by.as_str()));
            (StatusCode::OK, published.published)
        }
        RollbackOutcome::PendingApproval(version) => (StatusCode::ACCEPTED, version),
    };

    Ok((status, Json(version)))
}
