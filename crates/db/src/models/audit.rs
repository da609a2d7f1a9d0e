//! Audit log row model.

use embedkit_core::audit::AuditEntry;
use embedkit_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `audit_log` table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: DbId,
    pub integration_id: DbId,
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub actor: Option<String>,
    pub details: serde_json::Value,
    pub prev_hash: Option<String>,
    pub integrity_hash: String,
    pub created_at: Timestamp,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: row.id,
            integration_id: row.integration_id,
            event_type: row.event_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            actor: row.actor,
            details: row.details,
            prev_hash: row.prev_hash,
            integrity_hash: row.integrity_hash,
            created_at: row.created_at,
        }
    }
}
