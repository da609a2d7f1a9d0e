//! Handlers for versions: drafts, metadata edits, publishing, integrity
//! checks, and diffs.
//!
//! Creation and listing are nested under integrations
//! (`/integrations/{id}/versions`); everything else addresses a version
//! directly (`/versions/{id}`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use embedkit_core::diff::FieldChange;
use embedkit_core::lifecycle::CreateDraft;
use embedkit_core::types::DbId;
use embedkit_core::versioning::{DraftMetadataUpdate, Version};
use embedkit_events::event_types;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::handlers::{emit_publish_events, version_event};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for creating a draft.
#[derive(Debug, Deserialize)]
pub struct CreateVersionRequest {
    /// Defaults to the next label after the integration's latest version.
    pub version_label: Option<String>,
    pub created_by: String,
    pub release_notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Stored as the version's `config_snapshot`, which is also accepted here.
    #[serde(alias = "config_snapshot")]
    pub snapshot: Value,
}

/// Response of the snapshot integrity check.
#[derive(Debug, Serialize)]
pub struct SnapshotVerification {
    pub version_id: DbId,
    pub snapshot_hash: String,
    pub valid: bool,
}

/// GET /api/v1/integrations/{id}/versions
///
/// Newest first.
pub async fn list_by_integration(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Version>>>> {
    let versions = state
        .versions
        .list_versions(integration_id, params.page())
        .await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/integrations/{id}/versions
pub async fn create_draft(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
    Json(body): Json<CreateVersionRequest>,
) -> AppResult<(StatusCode, Json<Version>)> {
    let version = state
        .versions
        .create_draft(&CreateDraft {
            integration_id,
            version_label: body.version_label,
            created_by: body.created_by,
            release_notes: body.release_notes,
            tags: body.tags,
            snapshot: body.snapshot,
        })
        .await?;

    state.publish(
        version_event(event_types::VERSION_CREATED, &version)
            .with_actor(version.created_by.clone())
            .with_payload(json!({
                "version_label": version.version_label,
                "snapshot_hash": version.snapshot_hash,
                "change_count": version.changes.len(),
            })),
    );

    Ok((StatusCode::CREATED, Json(version)))
}

/// GET /api/v1/integrations/{id}/versions/published
///
/// `data` is `null` when nothing has been published yet.
pub async fn get_published(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Option<Version>>>> {
    let published = state.versions.find_published(integration_id).await?;
    Ok(Json(DataResponse { data: published }))
}

/// GET /api/v1/versions/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Version>> {
    let version = state.versions.get_version(id).await?;
    Ok(Json(version))
}

/// PATCH /api/v1/versions/{id}
///
/// Edits release notes and tags of a draft. Send `expected_updated_at` to
/// get a 409 instead of overwriting a concurrent edit.
pub async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(update): Json<DraftMetadataUpdate>,
) -> AppResult<Json<Version>> {
    let version = state.versions.update_draft_metadata(id, &update).await?;

    state.publish(version_event(event_types::VERSION_UPDATED, &version).with_payload(json!({
        "release_notes_changed": update.release_notes.is_some(),
        "tags": version.tags,
    })));

    Ok(Json(version))
}

/// POST /api/v1/versions/{id}/publish
///
/// Returns the published version. Fails with 412 while the approval policy
/// is unmet and 422 when the version is not a draft.
pub async fn publish(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Version>> {
    let outcome = state.versions.publish(id).await?;
    emit_publish_events(&state, &outcome, None);
    Ok(Json(outcome.published))
}

/// GET /api/v1/versions/{id}/verify
pub async fn verify(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<SnapshotVerification>> {
    let version = state.versions.get_version(id).await?;
    let valid = version.verify_snapshot();
    if !valid {
        tracing::error!(version_id = id, "Stored snapshot does not match its hash");
    }
    Ok(Json(SnapshotVerification {
        version_id: id,
        snapshot_hash: version.snapshot_hash,
        valid,
    }))
}

/// GET /api/v1/versions/{id}/diff/{other_id}
///
/// Changes that turn version `id` into version `other_id`.
pub async fn diff(
    State(state): State<AppState>,
    Path((id, other_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Vec<FieldChange>>>> {
    let changes = state.versions.diff_versions(id, other_id).await?;
    Ok(Json(DataResponse { data: changes }))
}
