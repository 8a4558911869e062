//! Schema alignment — reconcile model-emitted arguments with a capability's
//! declared JSON Schema before anything executes.
//!
//! Undeclared keys are dropped unless the schema sets `additionalProperties`.
//! Required fields that arrive missing or empty are filled by alias
//! substitution over [`ALIAS_CANDIDATES`], tried in order; the first
//! candidate present with a non-empty value is renamed into the required
//! field. Candidates are read from the original argument map, so a key
//! slated for dropping can still donate its value first. A schema without a
//! `properties` table is treated as unconstrained.

use serde_json::{Map, Value};

/// Alias candidates, tried in order after the required field's own name.
pub const ALIAS_CANDIDATES: [&str; 6] = ["query", "input", "prompt", "question", "text", "value"];

/// What alignment did to one argument set.
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    /// Arguments after dropping, renaming, and substitution
    pub arguments: Value,

    /// Undeclared keys that were removed
    pub dropped: Vec<String>,

    /// Human-readable problems that block execution
    pub issues: Vec<String>,
}

impl AlignmentOutcome {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Align `arguments` against `schema`.
pub fn align_arguments(schema: &Value, arguments: &Value) -> AlignmentOutcome {
    let mut issues = Vec::new();

    let mut map = match arguments.as_object() {
        Some(map) => map.clone(),
        None => {
            if !arguments.is_null() {
                issues.push("arguments must be a JSON object".to_string());
            }
            Map::new()
        }
    };

    let declared = schema.get("properties").and_then(Value::as_object);
    let allow_additional = schema
        .get("additionalProperties")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    // Fill required fields from aliases before any dropping happens.
    for field in &required {
        if has_value(&map, field) {
            continue;
        }
        let donor = std::iter::once(*field)
            .chain(ALIAS_CANDIDATES)
            .find(|&candidate| has_value(&map, candidate));
        match donor {
            Some(donor) => {
                if let Some(value) = map.remove(donor) {
                    tracing::debug!(field, donor, "aligned argument via alias");
                    map.insert(field.to_string(), value);
                }
            }
            None => issues.push(format!("required field `{field}` missing or empty")),
        }
    }

    let mut dropped = Vec::new();
    if let Some(declared) = declared
        && !allow_additional
    {
        let undeclared: Vec<String> = map
            .keys()
            .filter(|k| !declared.contains_key(*k))
            .cloned()
            .collect();
        for key in undeclared {
            map.remove(&key);
            dropped.push(key);
        }
    }

    AlignmentOutcome {
        arguments: Value::Object(map),
        dropped,
        issues,
    }
}

/// Present with a usable value: not absent, not null, not an empty string.
fn has_value(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
