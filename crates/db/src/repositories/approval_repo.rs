//! Repository for the `version_approvals` table.

use embedkit_core::types::{DbId, Timestamp};
use sqlx::postgres::PgExecutor;

use crate::models::approval::ApprovalRow;

const COLUMNS: &str = "id, version_id, approver, approved_at";

/// Provides idempotent inserts and lookups for version approvals.
pub struct ApprovalRepo;

impl ApprovalRepo {
    /// Record an approval unless this approver already approved the version.
    ///
    /// Returns `true` if a new row was inserted.
    pub async fn insert_if_absent<'e>(
        executor: impl PgExecutor<'e>,
        version_id: DbId,
        approver: &str,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO version_approvals (version_id, approver, approved_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (version_id, approver) DO NOTHING",
        )
        .bind(version_id)
        .bind(approver)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Approvals of a version in the order they were recorded.
    pub async fn list_by_version<'e>(
        executor: impl PgExecutor<'e>,
        version_id: DbId,
    ) -> Result<Vec<ApprovalRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM version_approvals WHERE version_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ApprovalRow>(&query)
            .bind(version_id)
            .fetch_all(executor)
            .await
    }
}
