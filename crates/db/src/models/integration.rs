//! Integration row model.

use embedkit_core::approval::ApprovalWorkflow;
use embedkit_core::integration::Integration;
use embedkit_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `integrations` table.
#[derive(Debug, Clone, FromRow)]
pub struct IntegrationRow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub approval_enabled: bool,
    pub required_approvers: i32,
    pub approvers: Vec<String>,
    pub auto_publish_on_approval: bool,
    pub rollback_requires_approval: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<IntegrationRow> for Integration {
    fn from(row: IntegrationRow) -> Self {
        Integration {
            id: row.id,
            name: row.name,
            description: row.description,
            approval_workflow: ApprovalWorkflow {
                enabled: row.approval_enabled,
                // CHECK (required_approvers >= 1)
                required_approvers: u32::try_from(row.required_approvers).unwrap_or(1),
                approvers: row.approvers,
                auto_publish_on_approval: row.auto_publish_on_approval,
                rollback_requires_approval: row.rollback_requires_approval,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
