//! Wire format contract tests
//!
//! These tests pin the exact JSON exchanged between two messengers. A peer
//! written in another language relies on nothing else.

use serde_json::Value;

// ===== Discriminants =====
pub const WIRE_REQUEST: &str = "REQUEST";
pub const WIRE_RESPONSE: &str = "RESPONSE";
pub const WIRE_EVENT: &str = "EVENT";

// ===== Field Sets =====
pub const REQUEST_FIELDS: [&str; 4] = ["action", "id", "payload", "type"];
pub const RESPONSE_FIELDS: [&str; 4] = ["error", "id", "payload", "type"];
pub const EVENT_FIELDS: [&str; 3] = ["action", "payload", "type"];
pub const ERROR_FIELDS: [&str; 3] = ["data", "message", "type"];

/// Sorted keys of a JSON object, empty for anything else
pub fn field_names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = value
        .as_object()
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default();
    names.sort();
    names
}

/// Verifies a value has exactly the expected keys
pub fn verify_fields(value: &Value, expected: &[&str]) {
    assert_eq!(
        field_names(value),
        expected.iter().map(|name| name.to_string()).collect::<Vec<_>>(),
        "Field set changed for {}",
        value
    );
}
