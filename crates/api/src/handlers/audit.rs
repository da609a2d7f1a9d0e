//! Handlers for the per-integration audit log.

use axum::extract::{Path, Query, State};
use axum::Json;
use embedkit_core::audit::{verify_chain, AuditEntry, ChainVerification};
use embedkit_core::types::DbId;

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/integrations/{id}/audit-log
///
/// Newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<AuditEntry>>>> {
    state.versions.get_integration(integration_id).await?;
    let entries = state.audit.list_audit(integration_id, params.page()).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/integrations/{id}/audit-log/verify
///
/// Walks the whole chain and reports the first entry whose hash does not
/// match.
pub async fn verify(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
) -> AppResult<Json<ChainVerification>> {
    state.versions.get_integration(integration_id).await?;
    let chain = state.audit.audit_chain(integration_id).await?;
    let result = verify_chain(&chain);
    if !result.valid {
        tracing::error!(
            integration_id,
            first_broken_id = result.first_broken_id,
            "Audit chain verification failed"
        );
    }
    Ok(Json(result))
}
