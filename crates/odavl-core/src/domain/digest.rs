//! Canonical JSON and SHA-256 digests used for cache keys and attestations.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::error::Result;

/// Recursively sort object keys so equal values serialize identically
/// regardless of construction order.
fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), sort_keys(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => serde_json::Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Compact JSON with sorted object keys. Array order is preserved.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(&sort_keys(value))?)
}

/// SHA-256 hex digest of raw bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 hex digest of the canonical JSON form of `value`.
pub fn compute_digest<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value)?;
    Ok(sha256_hex(canonical_json(&json)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_field_order_invariant() {
        let a = serde_json::json!({ "b": 1, "a": { "z": 1, "y": 2 } });
        let b = serde_json::json!({ "a": { "y": 2, "z": 1 }, "b": 1 });
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn test_canonical_json_array_order_preserved() {
        let a = serde_json::json!({ "d": ["x", "y"] });
        let b = serde_json::json!({ "d": ["y", "x"] });
        assert_ne!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn test_compute_digest_is_64_hex_chars() {
        let digest = compute_digest(&serde_json::json!({ "workspace": "/ws" })).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
