//! Repository for the append-only `audit_log` table.

use embedkit_core::audit::NewAuditEntry;
use embedkit_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit::AuditRow;

/// Column list for `audit_log` SELECT queries.
const COLUMNS: &str = "\
    id, integration_id, event_type, entity_type, entity_id, \
    actor, details, prev_hash, integrity_hash, created_at";

/// Provides chained inserts and reads for the audit log.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Integrity hash of the newest entry for an integration.
    ///
    /// Call while holding the integration lock so no other append can slip in
    /// between reading the tail and inserting.
    pub async fn last_hash(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        integration_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT integrity_hash FROM audit_log \
             WHERE integration_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(integration_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entry: &NewAuditEntry,
        prev_hash: Option<&str>,
        integrity_hash: &str,
    ) -> Result<AuditRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_log
                (integration_id, event_type, entity_type, entity_id, actor,
                 details, prev_hash, integrity_hash, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditRow>(&query)
            .bind(entry.integration_id)
            .bind(&entry.event_type)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(&entry.actor)
            .bind(&entry.details)
            .bind(prev_hash)
            .bind(integrity_hash)
            .bind(entry.created_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Entries of an integration, newest first.
    pub async fn list_by_integration(
        pool: &PgPool,
        integration_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_log
             WHERE integration_id = $1
             ORDER BY id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AuditRow>(&query)
            .bind(integration_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// The whole chain of an integration in append order.
    pub async fn chain(pool: &PgPool, integration_id: DbId) -> Result<Vec<AuditRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_log WHERE integration_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditRow>(&query)
            .bind(integration_id)
            .fetch_all(pool)
            .await
    }
}
