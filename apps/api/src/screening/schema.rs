//! Lenient schema validation for model output.
//!
//! Model output is untrusted. Each accessor validates one field and falls back to
//! an empty/absent value when the field is missing or has the wrong shape, so a
//! single bad field never fails the whole parse.

use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// First key in `keys` that holds a non-empty string (numbers are stringified).
pub fn opt_string(obj: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) => non_empty(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Like `opt_string` but returns an empty string when absent.
pub fn string_or_empty(obj: &JsonObject, keys: &[&str]) -> String {
    opt_string(obj, keys).unwrap_or_default()
}

/// String array filtered to non-empty, trimmed entries.
///
/// A single string is accepted as a one-element list; non-string items are dropped.
pub fn string_list(obj: &JsonObject, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|key| obj.get(*key)) else {
        return Vec::new();
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => non_empty(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => non_empty(s).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Array of JSON objects; non-object items are dropped.
pub fn object_list<'a>(obj: &'a JsonObject, keys: &[&str]) -> Vec<&'a JsonObject> {
    keys.iter()
        .find_map(|key| obj.get(*key))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// Nested object, if present.
pub fn object<'a>(obj: &'a JsonObject, keys: &[&str]) -> Option<&'a JsonObject> {
    keys.iter().find_map(|key| obj.get(*key)).and_then(Value::as_object)
}

/// A 0-100 score. Accepts numbers and numeric strings ("85", "85/100", "85%"),
/// clamps to range, and rejects anything non-finite.
pub fn score(obj: &JsonObject, keys: &[&str]) -> Option<u8> {
    let raw = keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_score_text(s),
        _ => None,
    })?;
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

/// Boolean that also understands "yes"/"no"/"true"/"false" strings.
pub fn boolean(obj: &JsonObject, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Score implied by a strengths/weaknesses split, 50 when both are empty.
pub fn ratio_score(strengths: usize, weaknesses: usize) -> u8 {
    let total = strengths + weaknesses;
    if total == 0 {
        return 50;
    }
    ((strengths as f64 / total as f64) * 100.0).round() as u8
}

fn parse_score_text(s: &str) -> Option<f64> {
    let head = s
        .trim()
        .split(['/', '%'])
        .next()
        .unwrap_or("")
        .trim();
    head.parse::<f64>().ok()
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
