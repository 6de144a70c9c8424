//! Canonical serialization and fingerprinting of provider requests.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Message, ParameterBag};

/// Serialize `value` deterministically.
///
/// Object keys are sorted at every depth, arrays keep their order and no
/// whitespace is emitted, so equal values always produce equal text no matter
/// how their maps were built.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compute the cache key for a request.
///
/// Hex-encoded SHA-256 over the canonical form of
/// `{"messages": [...], "parameters": {...}}`. Pure: the same transcript and
/// parameters always give the same key.
#[must_use]
pub fn fingerprint(messages: &[Message], parameters: &ParameterBag) -> String {
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        })
        .collect();
    let parameters: serde_json::Map<String, Value> = parameters
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let request = serde_json::json!({
        "messages": messages,
        "parameters": parameters,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&request).as_bytes());
    format!("{:x}", hasher.finalize())
}
