//! Repository for the `embed_keys` table.

use embedkit_core::embed_keys::{NewEmbedKey, UpdateEmbedKey};
use embedkit_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::embed_key::EmbedKeyRow;

const COLUMNS: &str = "id, integration_id, label, key_prefix, key_hash, is_active, \
    created_at, last_rotated_at";

/// Provides CRUD and rotation for embed keys.
pub struct EmbedKeyRepo;

impl EmbedKeyRepo {
    pub async fn create(pool: &PgPool, input: &NewEmbedKey) -> Result<EmbedKeyRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO embed_keys (integration_id, label, key_prefix, key_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmbedKeyRow>(&query)
            .bind(input.integration_id)
            .bind(&input.label)
            .bind(&input.key_prefix)
            .bind(&input.key_hash)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmbedKeyRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM embed_keys WHERE id = $1");
        sqlx::query_as::<_, EmbedKeyRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_integration(
        pool: &PgPool,
        integration_id: DbId,
    ) -> Result<Vec<EmbedKeyRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM embed_keys WHERE integration_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, EmbedKeyRow>(&query)
            .bind(integration_id)
            .fetch_all(pool)
            .await
    }

    /// Update label and active flag. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEmbedKey,
    ) -> Result<Option<EmbedKeyRow>, sqlx::Error> {
        let query = format!(
            "UPDATE embed_keys SET
                label = COALESCE($2, label),
                is_active = COALESCE($3, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmbedKeyRow>(&query)
            .bind(id)
            .bind(&input.label)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Replace the key material of an existing key.
    pub async fn rotate(
        pool: &PgPool,
        id: DbId,
        key_prefix: &str,
        key_hash: &str,
        at: Timestamp,
    ) -> Result<Option<EmbedKeyRow>, sqlx::Error> {
        let query = format!(
            "UPDATE embed_keys SET key_prefix = $2, key_hash = $3, last_rotated_at = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmbedKeyRow>(&query)
            .bind(id)
            .bind(key_prefix)
            .bind(key_hash)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a key. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM embed_keys WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
