//! Canonical request hashing.
//!
//! Derives a deterministic SHA-256 hex digest from any structurally
//! serializable value, independent of object-key insertion order. Two deeply
//! equal requests always hash to the same cache key, no matter how their maps
//! were built.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hashed in place of values that have no canonical JSON form.
const UNSERIALIZABLE_SENTINEL: &str = "<unserializable>";

/// Compute the canonical digest of any serializable value.
///
/// Values that fail JSON conversion (e.g. maps with non-string keys) hash a
/// fixed sentinel rather than erroring: such requests still get a stable key,
/// they just do not distinguish themselves by the offending field.
pub fn digest<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(v) => digest_value(&v),
        Err(_) => hex_sha256(UNSERIALIZABLE_SENTINEL.as_bytes()),
    }
}

/// Compute the canonical digest of an already-parsed JSON value.
pub fn digest_value(value: &Value) -> String {
    let mut rendered = String::new();
    render(value, &mut rendered);
    hex_sha256(rendered.as_bytes())
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Render a value into its canonical string form.
///
/// Objects render their keys in lexicographic order as `"key":value` pairs,
/// comma-joined and brace-delimited. Arrays keep element order. Scalars render
/// as JSON literals. An empty object (`{}`), an empty array (`[]`) and `null`
/// are all distinct.
fn render(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json escaping gives the canonical quoted literal.
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                render(&map[*key], out);
            }
            out.push('}');
        }
    }
}
