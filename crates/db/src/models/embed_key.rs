//! Embed key row model.

use embedkit_core::embed_keys::EmbedKey;
use embedkit_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `embed_keys` table.
#[derive(Debug, Clone, FromRow)]
pub struct EmbedKeyRow {
    pub id: DbId,
    pub integration_id: DbId,
    pub label: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub last_rotated_at: Option<Timestamp>,
}

impl From<EmbedKeyRow> for EmbedKey {
    fn from(row: EmbedKeyRow) -> Self {
        EmbedKey {
            id: row.id,
            integration_id: row.integration_id,
            label: row.label,
            key_prefix: row.key_prefix,
            key_hash: row.key_hash,
            is_active: row.is_active,
            created_at: row.created_at,
            last_rotated_at: row.last_rotated_at,
        }
    }
}
