//! Tests for canonical request hashing.

use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::json;
use tokenmeter::hash::{digest, digest_value};

#[test]
fn deep_equal_requests_hash_identically_regardless_of_key_order() {
    let a: serde_json::Value = serde_json::from_str(
        r#"{"model":"gpt-4o","temperature":0.2,"messages":[{"role":"user","content":"hi"}]}"#,
    )
    .unwrap();
    let b: serde_json::Value = serde_json::from_str(
        r#"{"messages":[{"content":"hi","role":"user"}],"temperature":0.2,"model":"gpt-4o"}"#,
    )
    .unwrap();

    assert_eq!(digest_value(&a), digest_value(&b));
}

#[test]
fn structurally_different_requests_hash_differently() {
    let a = json!({"model": "gpt-4o", "messages": ["hi"]});
    let b = json!({"model": "gpt-4o", "messages": ["hi", "there"]});
    let c = json!({"model": "gpt-4o-mini", "messages": ["hi"]});

    assert_ne!(digest_value(&a), digest_value(&b));
    assert_ne!(digest_value(&a), digest_value(&c));
}

#[test]
fn array_order_is_significant() {
    let a = json!({"stop": ["a", "b"]});
    let b = json!({"stop": ["b", "a"]});
    assert_ne!(digest_value(&a), digest_value(&b));
}

#[test]
fn typed_struct_and_equivalent_json_agree() {
    #[derive(Serialize)]
    struct Request {
        model: String,
        max_tokens: u32,
    }

    let typed = Request {
        model: "claude-sonnet".to_string(),
        max_tokens: 512,
    };
    let untyped = json!({"max_tokens": 512, "model": "claude-sonnet"});

    assert_eq!(digest(&typed), digest_value(&untyped));
}

#[test]
fn dates_hash_via_their_iso8601_rendering() {
    use chrono::{DateTime, Utc};

    let date: DateTime<Utc> = "2026-03-01T12:00:00Z".parse().unwrap();

    // chrono serializes to an ISO-8601 string, so the digest is the digest of
    // that string form and is stable across runs.
    let as_value = serde_json::to_value(date).unwrap();
    assert!(as_value.is_string());
    assert_eq!(digest(&date), digest_value(&as_value));

    let other: DateTime<Utc> = "2026-03-01T12:00:01Z".parse().unwrap();
    assert_ne!(digest(&date), digest(&other));
}

#[test]
fn empty_collections_and_null_are_distinguishable() {
    let object = digest_value(&json!({}));
    let array = digest_value(&json!([]));
    let null = digest_value(&json!(null));

    assert_ne!(object, array);
    assert_ne!(array, null);
    assert_ne!(object, null);
}

#[test]
fn values_without_a_canonical_form_still_get_a_stable_key() {
    use std::collections::HashMap;

    // Tuple keys have no JSON representation; the digest falls back to a
    // fixed sentinel instead of failing.
    let mut weird: HashMap<(u8, u8), u8> = HashMap::new();
    weird.insert((1, 2), 3);

    let key = digest(&weird);
    assert_eq!(key, digest(&weird));
    assert_eq!(key.len(), 64);
}

#[test]
fn digest_is_hex_encoded_sha256() {
    let key = digest_value(&json!({"model": "gpt-4o"}));
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}
