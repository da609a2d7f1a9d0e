//! Embed key generation and hashing.
//!
//! Embed keys identify an integration to the widget script. Only the
//! SHA-256 hash and a short display prefix are ever stored; the plaintext is
//! handed back once, on creation or rotation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Marker every embed key starts with, so leaked keys are recognizable.
pub const KEY_MARKER: &str = "emb_";

/// Number of random alphanumeric characters after the marker.
pub const KEY_RANDOM_LENGTH: usize = 40;

/// Number of leading characters stored as a human-visible prefix.
pub const KEY_PREFIX_LENGTH: usize = 12;

pub const MAX_LABEL_LENGTH: usize = 80;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedKey {
    pub id: DbId,
    pub integration_id: DbId,
    pub label: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub last_rotated_at: Option<Timestamp>,
}

/// Insert payload for a store.
#[derive(Debug, Clone)]
pub struct NewEmbedKey {
    pub integration_id: DbId,
    pub label: String,
    pub key_prefix: String,
    pub key_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmbedKey {
    pub label: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// The result of generating a new embed key.
pub struct GeneratedEmbedKey {
    /// The plaintext key (shown to the caller exactly once, never stored).
    pub plaintext: String,
    /// The first [`KEY_PREFIX_LENGTH`] characters of the key for display.
    pub prefix: String,
    /// The SHA-256 hex digest of the plaintext key.
    pub hash: String,
}

/// Generate a new random embed key.
pub fn generate_embed_key() -> GeneratedEmbedKey {
    let random: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_RANDOM_LENGTH)
        .map(char::from)
        .collect();
    let key = format!("{KEY_MARKER}{random}");

    GeneratedEmbedKey {
        prefix: extract_prefix(&key).to_string(),
        hash: hash_embed_key(&key),
        plaintext: key,
    }
}

/// Compute the SHA-256 hex digest of an embed key.
pub fn hash_embed_key(key: &str) -> String {
    crate::hashing::sha256_hex(key.as_bytes())
}

/// Extract the display prefix from a plaintext key.
pub fn extract_prefix(key: &str) -> &str {
    let end = key
        .char_indices()
        .nth(KEY_PREFIX_LENGTH)
        .map_or(key.len(), |(i, _)| i);
    &key[..end]
}

/// Validate and trim a key label.
pub fn validate_label(label: &str) -> Result<String, String> {
    let label = label.trim();
    if label.is_empty() {
        return Err("Embed key label must not be empty".into());
    }
    if label.chars().count() > MAX_LABEL_LENGTH {
        return Err(format!(
            "Embed key label must be at most {MAX_LABEL_LENGTH} characters"
        ));
    }
    Ok(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_marker_and_length() {
        let key = generate_embed_key();
        assert!(key.plaintext.starts_with(KEY_MARKER));
        assert_eq!(key.plaintext.len(), KEY_MARKER.len() + KEY_RANDOM_LENGTH);
        assert_eq!(key.prefix.len(), KEY_PREFIX_LENGTH);
        assert!(key.plaintext.starts_with(&key.prefix));
    }

    #[test]
    fn hash_matches_plaintext() {
        let key = generate_embed_key();
        assert_eq!(hash_embed_key(&key.plaintext), key.hash);
        assert_eq!(key.hash.len(), 64);
    }

    #[test]
    fn two_keys_differ() {
        assert_ne!(generate_embed_key().plaintext, generate_embed_key().plaintext);
    }

    #[test]
    fn prefix_of_short_key_is_whole_key() {
        assert_eq!(extract_prefix("abc"), "abc");
    }

    #[test]
    fn label_validation() {
        assert_eq!(validate_label("  Production site ").unwrap(), "Production site");
        assert!(validate_label("").is_err());
        assert!(validate_label(&"x".repeat(MAX_LABEL_LENGTH + 1)).is_err());
    }

    #[test]
    fn hash_is_not_serialized() {
        let key = EmbedKey {
            id: 1,
            integration_id: 2,
            label: "web".into(),
            key_prefix: "emb_abcdefgh".into(),
            key_hash: "secret-hash".into(),
            is_active: true,
            created_at: chrono::Utc::now(),
            last_rotated_at: None,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert!(json.get("key_hash").is_none());
    }
}
