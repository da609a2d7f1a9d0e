//! Handlers for the `/integrations` resource and its approval workflow.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use embedkit_core::approval::ApprovalWorkflow;
use embedkit_core::integration::{CreateIntegration, Integration};
use embedkit_core::types::DbId;
use embedkit_events::{event_types, PlatformEvent};
use serde_json::json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/integrations
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Integration>>>> {
    let integrations = state.versions.list_integrations().await?;
    Ok(Json(DataResponse { data: integrations }))
}

/// POST /api/v1/integrations
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateIntegration>,
) -> AppResult<(StatusCode, Json<Integration>)> {
    let integration = state.versions.create_integration(&input).await?;

    state.publish(
        PlatformEvent::new(event_types::INTEGRATION_CREATED, integration.id)
            .with_source("integration", integration.id)
            .with_payload(json!({
                "name": integration.name,
                "approval_workflow": integration.approval_workflow,
            })),
    );

    Ok((StatusCode::CREATED, Json(integration)))
}

/// GET /api/v1/integrations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Integration>> {
    let integration = state.versions.get_integration(id).await?;
    Ok(Json(integration))
}

/// GET /api/v1/integrations/{id}/approval-workflow
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApprovalWorkflow>> {
    let integration = state.versions.get_integration(id).await?;
    Ok(Json(integration.approval_workflow))
}

/// PUT /api/v1/integrations/{id}/approval-workflow
///
/// Replaces the whole workflow. Approvals already recorded are kept and
/// counted against the new threshold.
pub async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(workflow): Json<ApprovalWorkflow>,
) -> AppResult<Json<ApprovalWorkflow>> {
    let integration = state.versions.update_approval_workflow(id, &workflow).await?;

    state.publish(
        PlatformEvent::new(event_types::INTEGRATION_WORKFLOW_UPDATED, id)
            .with_source("integration", id)
            .with_payload(json!({ "approval_workflow": integration.approval_workflow })),
    );

    Ok(Json(integration.approval_workflow))
}
