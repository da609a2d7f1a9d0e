//! Version approval row model.

use embedkit_core::approval::Approval;
use embedkit_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `version_approvals` table.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalRow {
    pub id: DbId,
    pub version_id: DbId,
    pub approver: String,
    pub approved_at: Timestamp,
}

impl From<ApprovalRow> for Approval {
    fn from(row: ApprovalRow) -> Self {
        Approval {
            version_id: row.version_id,
            approver: row.approver,
            approved_at: row.approved_at,
        }
    }
}
