//! Context fingerprinting.
//!
//! The fingerprint identifies exactly what the model was shown. Keys are
//! sorted at every depth before hashing, so two snapshots with the same
//! content hash the same regardless of how they were assembled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "sha256";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub algorithm: String,
    /// Lowercase hex digest of the canonical JSON.
    pub hash: String,
    /// Length in bytes of the canonical JSON.
    pub context_bytes: usize,
}

/// Serialize with object keys sorted at every depth and no whitespace.
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

pub fn fingerprint(value: &Value) -> Fingerprint {
    let canonical = canonical_json(value);
    let digest = Sha256::digest(canonical.as_bytes());
    Fingerprint {
        algorithm: ALGORITHM.to_string(),
        hash: hex::encode(digest),
        context_bytes: canonical.len(),
    }
}
