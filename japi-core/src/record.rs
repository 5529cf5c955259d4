//! Raw record representation and id handling.
//!
//! A record is a flat JSON object: attribute fields hold primitive values and
//! relationship fields hold a raw id, an array of raw ids, an embedded
//! (already sideloaded) record, an array of embedded records, or null.

use serde_json::{Map, Value};

/// A flat record as stored by an adapter.
pub type Record = Map<String, Value>;

/// Coerces a JSON value into a numeric id.
///
/// The wire layer may deliver ids as numbers or as numeric strings; both are
/// accepted at the store boundary. Anything else yields `None`.
pub fn coerce_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(id) = n.as_u64() {
                Some(id)
            } else {
                // Tolerate integral floats from lossy wire decoders.
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            }
        }
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Returns a record's numeric id, if present and coercible.
pub fn record_id(record: &Record) -> Option<u64> {
    record.get("id").and_then(coerce_id)
}

/// Coerces a relationship value into a list of ids.
///
/// A single id yields a one-element list; an array yields every coercible
/// member. Null, embedded objects, and non-id members yield nothing.
pub fn coerce_ids(value: &Value) -> Vec<u64> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_id).collect(),
        other => coerce_id(other).into_iter().collect(),
    }
}

/// Shallow-merges a patch onto an existing record.
///
/// Patch fields fully replace same-named fields; fields absent from the patch
/// are untouched. The `id` field is identity and is never overwritten.
pub fn merge(existing: &mut Record, patch: Record) {
    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        existing.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn ids_coerce_from_numbers_and_strings() {
        assert_eq!(coerce_id(&json!(7)), Some(7));
        assert_eq!(coerce_id(&json!("7")), Some(7));
        assert_eq!(coerce_id(&json!(7.0)), Some(7));
        assert_eq!(coerce_id(&json!("x")), None);
        assert_eq!(coerce_id(&json!(null)), None);
        assert_eq!(coerce_id(&json!([7])), None);
    }

    #[test]
    fn ids_coerce_from_arrays() {
        assert_eq!(coerce_ids(&json!([1, "2", null, "x"])), vec![1, 2]);
        assert_eq!(coerce_ids(&json!(3)), vec![3]);
        assert!(coerce_ids(&json!(null)).is_empty());
    }

    #[test]
    fn merge_is_shallow_and_preserves_id() {
        let mut existing = record(json!({"id": 1, "name": "A", "age": 22}));
        merge(&mut existing, record(json!({"id": 9, "age": 23})));
        assert_eq!(existing["id"], json!(1));
        assert_eq!(existing["name"], json!("A"));
        assert_eq!(existing["age"], json!(23));
    }
}
