//! Canonical invocation fingerprints for duplicate suppression.
//!
//! The fingerprint is a SHA-256 over `name + "::" + canonical JSON` of the
//! arguments, where object keys are sorted lexicographically at every level.
//! Two plans that request the same capability with the same arguments hash
//! identically no matter what key order the model emitted them in.

use sha2::{Digest, Sha256};

/// Fingerprint one invocation.
pub fn fingerprint(name: &str, arguments: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"::");
    hasher.update(canonical_json(arguments).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Serialize with object keys sorted at every nesting level.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(&String, String)> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .iter()
                .map(|(k, v)| {
                    format!("{}:{v}", serde_json::Value::String((*k).clone()))
                })
                .collect();
            format!("{{{}}}", body.join(","))
        }
        serde_json::Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
