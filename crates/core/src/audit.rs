//! Audit log records and the per-integration integrity hash chain.
//!
//! Every lifecycle event lands in the audit log as an entry whose hash
//! covers its own content and the previous entry's hash, so any rewrite of
//! history breaks the chain from that point on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: DbId,
    pub integration_id: DbId,
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub actor: Option<String>,
    pub details: Value,
    pub prev_hash: Option<String>,
    pub integrity_hash: String,
    pub created_at: Timestamp,
}

/// Audit content before it is chained. The store computes the hashes while
/// holding the per-integration append lock.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub integration_id: DbId,
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub actor: Option<String>,
    pub details: Value,
    pub created_at: Timestamp,
}

impl NewAuditEntry {
    /// Canonical string hashed into the chain.
    ///
    /// Timestamps are rendered at microsecond precision, matching what
    /// PostgreSQL stores.
    pub fn entry_data(&self) -> String {
        serde_json::json!({
            "integration_id": self.integration_id,
            "event_type": self.event_type,
            "entity_type": self.entity_type,
            "entity_id": self.entity_id,
            "actor": self.actor,
            "details": self.details,
            "created_at": self
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        })
        .to_string()
    }
}

impl AuditEntry {
    /// Reconstruct the hashed content of a stored entry.
    pub fn entry_data(&self) -> String {
        NewAuditEntry {
            integration_id: self.integration_id,
            event_type: self.event_type.clone(),
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id,
            actor: self.actor.clone(),
            details: self.details.clone(),
            created_at: self.created_at,
        }
        .entry_data()
    }
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in each chain.
const CHAIN_SEED: &str = "EMBEDKIT_AUDIT_CHAIN_SEED_V1";

/// Compute the SHA-256 integrity hash for an audit log entry.
///
/// `prev_hash` is the integrity hash of the previous entry for the same
/// integration, or `None` for the first entry.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}

/// Outcome of walking an integration's audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub entries_checked: usize,
    pub first_broken_id: Option<DbId>,
}

/// Verify a chain given in append order (oldest first).
pub fn verify_chain(entries: &[AuditEntry]) -> ChainVerification {
    let mut prev: Option<&str> = None;
    for (checked, entry) in entries.iter().enumerate() {
        let expected = compute_integrity_hash(prev, &entry.entry_data());
        if entry.prev_hash.as_deref() != prev || entry.integrity_hash != expected {
            return ChainVerification {
                valid: false,
                entries_checked: checked + 1,
                first_broken_id: Some(entry.id),
            };
        }
        prev = Some(&entry.integrity_hash);
    }
    ChainVerification {
        valid: true,
        entries_checked: entries.len(),
        first_broken_id: None,
    }
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Keys whose values never reach the audit log.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "plaintext",
    "private_key",
    "authorization",
    "credential",
];

/// Replace the value of every key matching [`SENSITIVE_FIELDS`] with
/// `"[REDACTED]"`, recursing through objects and arrays.
pub fn redact_sensitive_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(key.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(redact_sensitive_fields).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(n: usize) -> Vec<AuditEntry> {
        let mut out: Vec<AuditEntry> = Vec::new();
        for i in 0..n {
            let new = NewAuditEntry {
                integration_id: 1,
                event_type: "version.created".into(),
                entity_type: Some("version".into()),
                entity_id: Some(i as DbId + 1),
                actor: Some("alice".into()),
                details: json!({"n": i}),
                created_at: chrono::Utc::now(),
            };
            let prev = out.last().map(|e| e.integrity_hash.clone());
            let integrity_hash = compute_integrity_hash(prev.as_deref(), &new.entry_data());
            out.push(AuditEntry {
                id: i as DbId + 1,
                integration_id: new.integration_id,
                event_type: new.event_type,
                entity_type: new.entity_type,
                entity_id: new.entity_id,
                actor: new.actor,
                details: new.details,
                prev_hash: prev,
                integrity_hash,
                created_at: new.created_at,
            });
        }
        out
    }

    #[test]
    fn first_entry_uses_seed() {
        let hash = compute_integrity_hash(None, "test_data");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_integrity_hash(Some(CHAIN_SEED), "test_data"));
    }

    #[test]
    fn different_prev_hash_produces_different_result() {
        let a = compute_integrity_hash(Some("hash_a"), "same_data");
        let b = compute_integrity_hash(Some("hash_b"), "same_data");
        assert_ne!(a, b);
    }

    #[test]
    fn intact_chain_verifies() {
        let result = verify_chain(&chain(4));
        assert!(result.valid);
        assert_eq!(result.entries_checked, 4);
        assert_eq!(result.first_broken_id, None);
    }

    #[test]
    fn empty_chain_is_valid() {
        assert!(verify_chain(&[]).valid);
    }

    #[test]
    fn tampered_details_break_the_chain() {
        let mut entries = chain(3);
        entries[1].details = json!({"n": 99});
        let result = verify_chain(&entries);
        assert!(!result.valid);
        assert_eq!(result.first_broken_id, Some(2));
    }

    #[test]
    fn removed_entry_breaks_the_chain() {
        let mut entries = chain(3);
        entries.remove(1);
        let result = verify_chain(&entries);
        assert!(!result.valid);
        assert_eq!(result.first_broken_id, Some(3));
    }

    #[test]
    fn redacts_nested_secrets() {
        let input = json!({
            "label": "web",
            "plaintext": "emb_abc",
            "nested": [{"client_secret": "x", "keep": 1}]
        });
        let out = redact_sensitive_fields(&input);
        assert_eq!(out["label"], "web");
        assert_eq!(out["plaintext"], "[REDACTED]");
        assert_eq!(out["nested"][0]["client_secret"], "[REDACTED]");
        assert_eq!(out["nested"][0]["keep"], 1);
    }
}
