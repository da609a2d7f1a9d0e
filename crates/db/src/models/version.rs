//! Version row model.

use embedkit_core::diff::FieldChange;
use embedkit_core::error::CoreError;
use embedkit_core::types::{DbId, Timestamp};
use embedkit_core::versioning::{Version, VersionStatus};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `versions` table.
#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub id: DbId,
    pub integration_id: DbId,
    pub version_label: String,
    pub status: String,
    pub created_by: String,
    pub release_notes: String,
    pub tags: Vec<String>,
    pub config_snapshot: serde_json::Value,
    pub snapshot_hash: String,
    pub changes: Json<Vec<FieldChange>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub is_rollback: bool,
    pub rollback_from_version: Option<DbId>,
    pub rollback_reason: Option<String>,
    pub published_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<VersionRow> for Version {
    type Error = CoreError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let status = VersionStatus::parse(&row.status).map_err(CoreError::Internal)?;
        Ok(Version {
            id: row.id,
            integration_id: row.integration_id,
            version_label: row.version_label,
            status,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            published_at: row.published_at,
            archived_at: row.archived_at,
            release_notes: row.release_notes,
            tags: row.tags,
            config_snapshot: row.config_snapshot,
            snapshot_hash: row.snapshot_hash,
            changes: row.changes.0,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            is_rollback: row.is_rollback,
            rollback_from_version: row.rollback_from_version,
            rollback_reason: row.rollback_reason,
        })
    }
}
