//! Repository for the `versions` table.
//!
//! Status changes happen only through [`VersionRepo::mark_published`] and
//! [`VersionRepo::archive`], both of which expect the caller to hold the
//! integration lock (see [`crate::repositories::IntegrationRepo::lock`]).
//! The `versions_guard` trigger rejects snapshot rewrites and backward
//! status moves regardless of caller.

use embedkit_core::types::{DbId, Timestamp};
use embedkit_core::versioning::NewVersion;
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::version::VersionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, integration_id, version_label, status, created_by, \
    release_notes, tags, config_snapshot, snapshot_hash, changes, approved_by, \
    approved_at, is_rollback, rollback_from_version, rollback_reason, \
    published_at, archived_at, created_at, updated_at";

/// Provides version inserts, lookups, and lifecycle transitions.
pub struct VersionRepo;

impl VersionRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new version in `draft` status.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewVersion,
    ) -> Result<VersionRow, sqlx::Error> {
        let (rollback_from_version, rollback_reason) = match &input.rollback {
            Some(origin) => (Some(origin.from_version), Some(origin.reason.as_str())),
            None => (None, None),
        };
        let query = format!(
            "INSERT INTO versions
                (integration_id, version_label, created_by, release_notes, tags,
                 config_snapshot, snapshot_hash, changes, is_rollback,
                 rollback_from_version, rollback_reason)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(input.integration_id)
            .bind(&input.version_label)
            .bind(&input.created_by)
            .bind(&input.release_notes)
            .bind(&input.tags)
            .bind(&input.config_snapshot)
            .bind(&input.snapshot_hash)
            .bind(Json(&input.changes))
            .bind(input.rollback.is_some())
            .bind(rollback_from_version)
            .bind(rollback_reason)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM versions WHERE id = $1");
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock a version row for the rest of the transaction.
    pub async fn find_by_id_for_update(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM versions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List versions of an integration, most recently created first.
    pub async fn list_by_integration(
        pool: &PgPool,
        integration_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions
             WHERE integration_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(integration_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// The most recently created version of an integration.
    pub async fn find_latest(
        pool: &PgPool,
        integration_id: DbId,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions
             WHERE integration_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(integration_id)
            .fetch_optional(pool)
            .await
    }

    /// Update release notes and tags. Only non-`None` fields are applied.
    ///
    /// `updated_at` strictly increases so it can serve as a concurrency token.
    pub async fn update_metadata(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        release_notes: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<VersionRow, sqlx::Error> {
        let query = format!(
            "UPDATE versions SET
                release_notes = COALESCE($2, release_notes),
                tags = COALESCE($3, tags),
                updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .bind(release_notes)
            .bind(tags)
            .fetch_one(&mut **tx)
            .await
    }

    // ── Lifecycle transitions ────────────────────────────────────────

    /// The currently published version of an integration (if any).
    pub async fn find_published<'e>(
        executor: impl PgExecutor<'e>,
        integration_id: DbId,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions \
             WHERE integration_id = $1 AND status = 'published'"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(integration_id)
            .fetch_optional(executor)
            .await
    }

    /// Move a published version to `archived`.
    pub async fn archive(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        at: Timestamp,
    ) -> Result<VersionRow, sqlx::Error> {
        let query = format!(
            "UPDATE versions SET status = 'archived', archived_at = $2, updated_at = $2 \
             WHERE id = $1 AND status = 'published' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move a draft to `published`.
    pub async fn mark_published(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        at: Timestamp,
    ) -> Result<VersionRow, sqlx::Error> {
        let query = format!(
            "UPDATE versions SET status = 'published', published_at = $2, updated_at = $2 \
             WHERE id = $1 AND status = 'draft' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Stamp the approver whose approval met the threshold. A version that is
    /// already stamped keeps its first approver.
    pub async fn stamp_approval(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        approver: &str,
        at: Timestamp,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE versions SET approved_by = $2, approved_at = $3, updated_at = $3 \
             WHERE id = $1 AND approved_by IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .bind(approver)
            .bind(at)
            .fetch_optional(&mut **tx)
            .await
    }
}
