//! Key-adjacent field redaction shared between the audit sanitizer (§4.6)
//! and the structured logger (§4.9). One field-name set, one place that
//! decides what "looks like a secret" means.

use serde_json::Value;

/// Field names (case-insensitive, underscore-or-camel variants folded)
/// that must never reach a persisted or logged record.
const KEY_ADJACENT_FIELDS: &[&str] = &[
    "secretkey",
    "privatekey",
    "keypair",
    "seed",
    "mnemonic",
    "keymaterial",
];

/// Normalizes a field name for comparison against [`KEY_ADJACENT_FIELDS`]:
/// lowercase, underscores stripped, so `secret_key`, `secretKey`, and
/// `SECRETKEY` all normalize to `secretkey`.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

pub fn is_key_adjacent_field(name: &str) -> bool {
    let normalized = normalize(name);
    KEY_ADJACENT_FIELDS.contains(&normalized.as_str())
}

/// Recursively walks `value`, returning a copy with any object field whose
/// name matches the key-adjacent set removed. Applies inside arrays too.
/// The input tree is never mutated.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if is_key_adjacent_field(k) {
                    continue;
                }
                out.insert(k.clone(), sanitize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

/// Verifies that `json` contains no key-adjacent substring, case-insensitive.
/// Intended for test assertions against a serialized blob, not for
/// production gating (sanitize before serializing instead).
pub fn assert_no_key_material(json: &str) -> Result<(), String> {
    let lower = json.to_lowercase();
    for field in KEY_ADJACENT_FIELDS {
        if lower.contains(field) {
            return Err(format!("serialized payload contains forbidden field `{field}`"));
        }
    }
    Ok(())
}
