//! Repository for the `integrations` table.

use embedkit_core::approval::ApprovalWorkflow;
use embedkit_core::integration::CreateIntegration;
use embedkit_core::types::DbId;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;

use crate::models::integration::IntegrationRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, approval_enabled, required_approvers, \
    approvers, auto_publish_on_approval, rollback_requires_approval, created_at, updated_at";

/// Provides CRUD operations and row locking for integrations.
pub struct IntegrationRepo;

impl IntegrationRepo {
    /// Insert a new integration. A missing workflow falls back to the column defaults.
    pub async fn create(
        pool: &PgPool,
        input: &CreateIntegration,
    ) -> Result<IntegrationRow, sqlx::Error> {
        let workflow = input.approval_workflow.clone().unwrap_or_default();
        let query = format!(
            "INSERT INTO integrations
                (name, description, approval_enabled, required_approvers, approvers,
                 auto_publish_on_approval, rollback_requires_approval)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(workflow.enabled)
            .bind(required_approvers(&workflow))
            .bind(&workflow.approvers)
            .bind(workflow.auto_publish_on_approval)
            .bind(workflow.rollback_requires_approval)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<IntegrationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integrations WHERE id = $1");
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List all integrations, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<IntegrationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integrations ORDER BY id");
        sqlx::query_as::<_, IntegrationRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Replace the approval workflow. Returns `None` if the integration does not exist.
    pub async fn update_workflow(
        pool: &PgPool,
        id: DbId,
        workflow: &ApprovalWorkflow,
    ) -> Result<Option<IntegrationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE integrations SET
                approval_enabled = $2,
                required_approvers = $3,
                approvers = $4,
                auto_publish_on_approval = $5,
                rollback_requires_approval = $6,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(id)
            .bind(workflow.enabled)
            .bind(required_approvers(workflow))
            .bind(&workflow.approvers)
            .bind(workflow.auto_publish_on_approval)
            .bind(workflow.rollback_requires_approval)
            .fetch_optional(pool)
            .await
    }

    /// Take the row lock that serializes status changes and audit appends
    /// for one integration. Returns `false` if the integration does not exist.
    ///
    /// Must run inside a transaction; the lock is held until it ends.
    pub async fn lock(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM integrations WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(row.is_some())
    }
}

fn required_approvers(workflow: &ApprovalWorkflow) -> i32 {
    i32::try_from(workflow.required_approvers).unwrap_or(i32::MAX)
}
