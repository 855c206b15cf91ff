// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Change detection via payload fingerprinting.
//!
//! A fingerprint is a truncated SHA-256 of a canonical serialization of
//! the payload: object keys sorted recursively, with a configured
//! ignore-list of volatile field paths removed first. Same logical
//! payload always yields the same fingerprint, independent of field
//! ordering and of noise fields like server timestamps.

use crate::models::{ChangeEvent, Stream};
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters kept from the full SHA-256 digest.
const FINGERPRINT_LEN: usize = 16;

/// Computes payload fingerprints and gates webhook dispatch on them.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    /// Volatile field paths stripped before hashing. Dotted paths
    /// address nested objects (`"map.updated_at"`).
    ignore_fields: Vec<String>,
}

impl ChangeDetector {
    /// Create a detector with the given ignore-list.
    pub fn new(ignore_fields: Vec<String>) -> Self {
        Self { ignore_fields }
    }

    /// Compute the stable fingerprint of a payload.
    pub fn fingerprint(&self, payload: &Value) -> String {
        let mut stripped = payload.clone();
        for field in &self.ignore_fields {
            remove_path(&mut stripped, field);
        }

        let mut canonical = String::new();
        write_canonical(&stripped, &mut canonical);

        let digest = Sha256::digest(canonical.as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(FINGERPRINT_LEN);
        hash
    }

    /// Compare a freshly fetched payload against the last known
    /// fingerprint. Returns a [`ChangeEvent`] when they differ; the
    /// caller is responsible for storing the event's fingerprint in its
    /// stream state.
    pub fn diff(
        &self,
        stream: Stream,
        payload: &Value,
        last_fingerprint: Option<&str>,
    ) -> Option<ChangeEvent> {
        let fingerprint = self.fingerprint(payload);
        if last_fingerprint == Some(fingerprint.as_str()) {
            return None;
        }

        Some(ChangeEvent {
            stream,
            fingerprint,
            payload: payload.clone(),
            detected_at: Utc::now(),
        })
    }
}

/// Remove a (possibly dotted) field path from a JSON value.
fn remove_path(value: &mut Value, path: &str) {
    let mut current = value;
    let mut parts = path.split('.').peekable();

    while let Some(part) = parts.next() {
        let Some(map) = current.as_object_mut() else {
            return;
        };

        if parts.peek().is_none() {
            map.remove(part);
            return;
        }

        match map.get_mut(part) {
            Some(next) => current = next,
            None => return,
        }
    }
}

/// Serialize a JSON value with object keys in sorted order.
///
/// `serde_json`'s default map already iterates sorted, but spelling the
/// canonical form out here keeps fingerprints stable even if the crate
/// is built with `preserve_order` elsewhere in the dependency graph.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(child) = map.get(*key) {
                    write_canonical(child, out);
                }
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
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_ignores_field_order() {
        let detector = ChangeDetector::new(vec![]);
        let a = json!({"power": 250, "heartrate": 150, "nested": {"b": 2, "a": 1}});
        let b = json!({"nested": {"a": 1, "b": 2}, "heartrate": 150, "power": 250});
        assert_eq!(detector.fingerprint(&a), detector.fingerprint(&b));
    }

    #[test]
    fn test_remove_nested_path() {
        let mut value = json!({"map": {"updated_at": 1, "polyline": "abc"}});
        remove_path(&mut value, "map.updated_at");
        assert_eq!(value, json!({"map": {"polyline": "abc"}}));
    }

    #[test]
    fn test_remove_path_missing_is_noop() {
        let mut value = json!({"a": 1});
        remove_path(&mut value, "b.c");
        assert_eq!(value, json!({"a": 1}));
    }
}
