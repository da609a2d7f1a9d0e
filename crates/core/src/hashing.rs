//! SHA-256 helpers shared by snapshot integrity, embed keys, and the audit
//! hash chain.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Hash a JSON value in its canonical serialized form.
///
/// `serde_json::Map` keeps keys sorted, so two structurally equal values
/// always serialize to the same bytes regardless of how they were built.
pub fn canonical_json_hash(value: &serde_json::Value) -> String {
    sha256_hex(value.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_hash_ignores_key_insertion_order() {
        let mut a = serde_json::Map::new();
        a.insert("z".into(), json!(1));
        a.insert("a".into(), json!({"y": 2, "b": 3}));
        let b = json!({"a": {"b": 3, "y": 2}, "z": 1});
        assert_eq!(
            canonical_json_hash(&serde_json::Value::Object(a)),
            canonical_json_hash(&b)
        );
    }

    #[test]
    fn canonical_hash_differs_on_value_change() {
        assert_ne!(
            canonical_json_hash(&json!({"a": 1})),
            canonical_json_hash(&json!({"a": 2}))
        );
    }
}
